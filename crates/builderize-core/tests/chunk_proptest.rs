use builderize_core::transform::chunker::{chunk_text, split_units, unit_count};
use builderize_core::transform::flatten::flatten;
use builderize_core::{parse, print, transform, Node, TransformConfig};
use proptest::prelude::*;

fn literal_content() -> impl Strategy<Value = String> {
    let unit = prop_oneof![
        "[a-zA-Z0-9 ,.!?]",
        Just("\\n".to_string()),
        Just("\\\"".to_string()),
        Just("\\\\".to_string()),
        Just("\\x41".to_string()),
        Just("\\u00e9".to_string()),
        Just("\\101".to_string()),
        Just("é".to_string()),
        Just("世".to_string()),
    ];
    prop::collection::vec(unit, 0..80).prop_map(|units| units.concat())
}

proptest! {
    #[test]
    fn chunks_concatenate_to_original(content in literal_content(), bound in 1usize..40) {
        let chunks = chunk_text(&content, bound, false);
        prop_assert_eq!(chunks.concat(), content.clone());

        let units = unit_count(&content, false);
        let expected = if units == 0 { 1 } else { units.div_ceil(bound) };
        prop_assert_eq!(chunks.len(), expected);

        for chunk in &chunks {
            prop_assert!(unit_count(chunk, false) <= bound);
            // A chunk never ends inside an escape sequence.
            prop_assert_eq!(split_units(chunk, false).concat(), chunk.clone());
        }
    }

    #[test]
    fn chunked_literal_reparses_with_same_pieces(content in literal_content(), bound in 1usize..16) {
        let source = format!("package p\n\nvar v = \"{content}\" + \"\"\n");
        let mut tree = parse(&source).unwrap();
        transform(&mut tree, &TransformConfig::with_chunk_size(bound).unwrap());
        let output = print(&tree).unwrap();

        let reparsed = parse(&output).unwrap();
        let value = reparsed
            .preorder(reparsed.root())
            .find_map(|id| match reparsed.get(id) {
                Node::ValueSpec { values, .. } => values.first().copied(),
                _ => None,
            })
            .unwrap();
        let joined: String = flatten(&reparsed, value)
            .into_iter()
            .map(|operand| match reparsed.get(operand) {
                Node::BasicLit { value, .. } => value[1..value.len() - 1].to_string(),
                other => panic!("unexpected operand {}", other.kind_name()),
            })
            .collect();
        prop_assert_eq!(joined, content);
    }
}
