//! Pairwise token affinities: co-occurrence training and the fixed-capacity
//! table the scores are stored in.
//!
//! Keys are `source * max_id + target`, where `max_id` is one past the
//! largest identifier of the lexicon the trainer ran with. A table is only
//! meaningful together with that lexicon.

mod table;
mod trainer;

pub use table::{composite_key, AffinityRecord, AffinityTable, MAX_LOAD_FACTOR, SLOTS_PER_RECORD};
pub use trainer::{AffinitySettings, AffinityTrainer, AffinityTriple};
