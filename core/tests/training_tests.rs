use cnlex::affinity::{AffinityTable, AffinityTrainer};
use cnlex::config::Config;
use cnlex::lexicon::{Lexicon, LexiconFactory, LexiconKind};
use cnlex::stats::WordTrainer;
use cnlex::LexError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn write_corpus(root: &Path, docs: &[&str]) {
    fs::create_dir_all(root).unwrap();
    for (i, doc) in docs.iter().enumerate() {
        fs::write(root.join(format!("doc{i}.txt")), doc).unwrap();
    }
}

fn config(dir: &Path, extra: &[(&str, String)]) -> Config {
    let parser = dir.join("parser.cfg");
    fs::write(&parser, "tokenizer = whitespace\nsplit_tags = 0\n").unwrap();
    let mut text = format!(
        "bamboo_cfg = {}\nfreq_threshold = 1\nfeature_min_length = 1\nfeature_min_utf8_length = 1\n\
         df_threshold = 1\nword_top_relation = 2\n\
         token_id_dict = {}\ntoken_df_dict = {}\ntoken_aff_dict = {}\n",
        parser.display(),
        dir.join("out/ids.idx").display(),
        dir.join("out/df.idx").display(),
        dir.join("out/aff.idx").display(),
    );
    for (k, v) in extra {
        text.push_str(&format!("{k} = {v}\n"));
    }
    let path = dir.join("train.cfg");
    fs::write(&path, text).unwrap();
    Config::load(&path).unwrap()
}

fn out(dir: &Path, name: &str) -> PathBuf {
    dir.join("out").join(name)
}

#[test]
fn df_threshold_drops_rare_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(&corpus, &["A B C D", "A C E F", "A C D G"]);
    let cfg = config(dir.path(), &[("df_threshold", "2".into())]);

    let mut trainer = WordTrainer::from_config(&cfg).unwrap();
    assert_eq!(trainer.parse_dir(&corpus).unwrap(), 3);
    trainer.save_token_dicts(LexiconKind::Trie).unwrap();

    let ids = LexiconFactory::load(out(dir.path(), "ids.idx")).unwrap();
    let dfs = LexiconFactory::load(out(dir.path(), "df.idx")).unwrap();
    assert_eq!(ids.search("A"), 1);
    assert_eq!(ids.search("C"), 2);
    assert_eq!(ids.search("D"), 3);
    assert_eq!(ids.search("B"), 0);
    assert_eq!(ids.len(), 3);
    assert_eq!(dfs.search("A"), 3);
    assert_eq!(dfs.search("D"), 2);
    assert_eq!(dfs.search("B"), 0);
}

#[test]
fn filtered_tokens_never_reach_the_dictionaries() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(&corpus, &["北京 北京 北 北 ab ab 大学", "北京 北京 大学 大学 北 北"]);
    let cfg = config(
        dir.path(),
        &[
            ("freq_threshold", "2".into()),
            ("feature_min_length", "3".into()),
            ("feature_min_utf8_length", "2".into()),
        ],
    );
    let mut trainer = WordTrainer::from_config(&cfg).unwrap();
    trainer.parse_dir(&corpus).unwrap();
    let (ids, dfs) = trainer.save_token_dicts(LexiconKind::Hash).unwrap();

    for rejected in ["北", "ab"] {
        assert_eq!(ids.search(rejected), 0, "{rejected}");
        assert_eq!(dfs.search(rejected), 0, "{rejected}");
    }
    // 大学 occurs once in the first document, so only the second counts
    assert_eq!(dfs.search("大学"), 1);
    assert_eq!(dfs.search("北京"), 2);
}

#[test]
fn identifiers_are_contiguous_from_one() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(&corpus, &["q w e r t y", "y t u i o", "p a s d q"]);
    let cfg = config(dir.path(), &[]);
    let mut trainer = WordTrainer::from_config(&cfg).unwrap();
    trainer.parse_dir(&corpus).unwrap();
    let (ids, _) = trainer.save_token_dicts(LexiconKind::Trie).unwrap();

    let mut values: Vec<u32> = ids.entries().into_iter().map(|(_, v)| v).collect();
    values.sort_unstable();
    let expected: Vec<u32> = (1..=ids.len() as u32).collect();
    assert_eq!(values, expected);
    assert_eq!(ids.max_value() as usize, ids.len());
}

#[test]
fn missing_keys_fail_trainer_setup() {
    let cfg = Config::from_pairs([("freq_threshold", "1")]);
    assert!(matches!(WordTrainer::from_config(&cfg), Err(LexError::Config(_))));
    assert!(AffinityTrainer::from_config(&cfg).is_err());
}

#[test]
fn affinity_training_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(
        &corpus,
        &["甲 甲 乙 乙 丙 丁", "甲 甲 丙 丙 乙 丁", "乙 乙 丙 丙 甲 丁"],
    );
    let cfg = config(dir.path(), &[]);

    let mut words = WordTrainer::from_config(&cfg).unwrap();
    words.parse_dir(&corpus).unwrap();
    words.save_token_dicts(LexiconKind::Trie).unwrap();

    let mut trainer = AffinityTrainer::from_config(&cfg).unwrap();
    assert_eq!(trainer.parse_dir(&corpus).unwrap(), 3);
    let built = trainer.save_table().unwrap();
    assert_eq!(built.len(), 6);

    let ids = LexiconFactory::load(out(dir.path(), "ids.idx")).unwrap();
    let table = AffinityTable::load(&out(dir.path(), "aff.idx")).unwrap();
    assert_eq!(table.len(), 6);
    assert_eq!(table.max_id(), u64::from(ids.max_value()) + 1);

    let names = ["甲", "乙", "丙"];
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for a in names {
        for b in names.iter().filter(|&&b| b != a) {
            let w = table.affinity_of(&ids, a, b).unwrap();
            *sums.entry(a).or_insert(0.0) += w;
        }
        assert_eq!(table.affinity_of(&ids, a, "丁"), None);
    }
    for (word, sum) in sums {
        assert!((sum - 1.0).abs() < 1e-9, "{word}: {sum}");
    }

    let dump = dir.path().join("aff.txt");
    assert_eq!(table.write_to_text(&dump).unwrap(), 6);
    assert_eq!(fs::read_to_string(dump).unwrap().lines().count(), 6);
}

#[test]
fn failed_table_build_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    write_corpus(&corpus, &["甲 甲 乙 乙 丙 丁"]);
    let cfg = config(dir.path(), &[]);
    let mut words = WordTrainer::from_config(&cfg).unwrap();
    words.parse_dir(&corpus).unwrap();
    words.save_token_dicts(LexiconKind::Hash).unwrap();

    let mut trainer = AffinityTrainer::from_config(&cfg).unwrap();
    trainer.parse_dir(&corpus).unwrap();
    let triples = trainer.compute_affinities();
    assert_eq!(triples.len(), 2);

    let tiny = AffinityTable::with_slots(trainer.max_id(), 2);
    let err = trainer.fill_table(tiny, &triples).unwrap_err();
    assert!(matches!(err, LexError::Capacity { capacity: 2, len: 2 }));
    assert!(!out(dir.path(), "aff.idx").exists());
}
