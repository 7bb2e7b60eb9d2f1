use cnlex::lexicon::{Lexicon, LexiconFactory, LexiconKind};
use cnlex::processor::{BreakProcessor, Processor};
use cnlex::Token;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn entries() -> Vec<(String, u32)> {
    let chars: Vec<char> = "的一是在不了有和人这中大为上个国我以要他时来用们生到作地于出就分对成会可主发年动同工也能下过子说产种面而方后多定行学法所民得经".chars().collect();
    let mut out = Vec::new();
    for (i, a) in chars.iter().enumerate() {
        for b in &chars {
            for c in chars.iter().take(8) {
                out.push((format!("{a}{b}{c}"), i as u32 * 2 + 2));
            }
        }
    }
    out
}

fn bench_search(c: &mut Criterion) {
    let entries = entries();
    let probes: Vec<String> = entries.iter().step_by(97).map(|(k, _)| k.clone()).collect();
    for kind in [LexiconKind::Trie, LexiconKind::Hash] {
        let lex = LexiconFactory::from_entries(kind, entries.clone()).unwrap();
        c.bench_function(&format!("search_{kind}"), |b| {
            b.iter(|| probes.iter().map(|p| lex.search(black_box(p))).sum::<u32>())
        });
    }
}

fn bench_break(c: &mut Criterion) {
    let entries = entries();
    let lex = LexiconFactory::from_entries(LexiconKind::Trie, entries.clone()).unwrap();
    let mut p = BreakProcessor::new(lex, 2, 16).unwrap();
    let tokens: Vec<Token> = entries.iter().step_by(31).map(|(k, _)| Token::new(k.as_str())).collect();
    c.bench_function("break_tokens", |b| b.iter(|| p.process(black_box(&tokens)).unwrap().len()));
}

criterion_group!(benches, bench_search, bench_break);
criterion_main!(benches);
