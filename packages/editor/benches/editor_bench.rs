use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xedit_editor::{units, EditorConfig, EditorSession};
use xedit_schema::{Mode, Schema};

fn dictionary(entries: usize) -> String {
    let mut xml = String::from("<dictionary>");
    for i in 0..entries {
        xml.push_str(&format!(
            "<entry id='e{i}'><headword>word {i}</headword>\
             <sense n='1'><gloss>first meaning</gloss></sense>\
             <sense n='2'><gloss>second meaning</gloss></sense></entry>"
        ));
    }
    xml.push_str("</dictionary>");
    xml
}

fn load_session(c: &mut Criterion) {
    let source = dictionary(200);
    c.bench_function("load_200_entries", |b| {
        b.iter(|| EditorSession::from_xml(black_box(&source), Schema::default(), EditorConfig::default()))
    });
}

fn traverse_units(c: &mut Criterion) {
    let session = EditorSession::from_xml(&dictionary(200), Schema::default(), EditorConfig::default())
        .expect("bench document parses");
    c.bench_function("units_200_entries", |b| b.iter(|| units(black_box(session.view()), Mode::Nerd)));
}

fn edit_and_refresh(c: &mut Criterion) {
    let source = dictionary(200);
    c.bench_function("duplicate_entry_200", |b| {
        b.iter_batched(
            || EditorSession::from_xml(&source, Schema::default(), EditorConfig::default()).expect("bench document parses"),
            |mut session| {
                let first = session.view().root().child_elements().next().map(|el| el.id());
                if let Some(id) = first {
                    session.duplicate_element(id);
                }
                session
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, load_session, traverse_units, edit_and_refresh);
criterion_main!(benches);
