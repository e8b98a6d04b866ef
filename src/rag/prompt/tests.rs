use super::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn dedupe_keeps_first_occurrence_in_rank_order() {
    let chunks = strings(&["B", "A", "B", "C", "A"]);
    assert_eq!(dedupe_chunks(&chunks), vec!["B", "A", "C"]);
}

#[test]
fn dedupe_compares_trimmed_text() {
    let chunks = strings(&["  Q: x? A: y.\n", "Q: x? A: y.", "   "]);
    assert_eq!(dedupe_chunks(&chunks), vec!["Q: x? A: y."]);
}

#[test]
fn render_lays_out_sections() {
    let template = PromptTemplate::new("Be kind.");
    let prompt = template.render(&strings(&["first", "second"]), "How often?");

    assert_eq!(
        prompt,
        "Be kind.\n\nSources:\nfirst\nsecond\n\nUser Question: How often?\n\nHelpful Answer:"
    );
}

#[test]
fn render_with_duplicate_chunks_lists_each_once() {
    let template = PromptTemplate::new("P");
    let prompt = template.render(&strings(&["B", "A", "B"]), "q");

    assert!(prompt.contains("Sources:\nB\nA\n\nUser Question"));
    assert_eq!(prompt.matches('B').count(), 1);
}

#[test]
fn render_with_no_chunks_keeps_empty_sources_section() {
    let template = PromptTemplate::new("P");
    let prompt = template.render(&[], "q");

    assert_eq!(prompt, "P\n\nSources:\n\n\nUser Question: q\n\nHelpful Answer:");
}

#[test]
fn default_template_uses_built_in_preamble() {
    let template = PromptTemplate::default();
    assert_eq!(template.preamble(), DEFAULT_PREAMBLE);

    let prompt = template.render(&strings(&["chunk"]), "question");
    assert!(prompt.starts_with("You are a breastfeeding expert."));
    assert!(prompt.ends_with("Helpful Answer:"));
}

#[test]
fn from_config_reads_preamble() {
    let config = PromptConfig {
        preamble: "Custom".to_string(),
    };
    assert_eq!(PromptTemplate::from_config(&config).preamble(), "Custom");
}
