use similar::{Algorithm, ChangeTag, TextDiff};

/// Line diff of `old` and `new` with `context` lines around each hunk.
/// Carriage returns are spelled out so break changes stay visible.
pub fn render(old: &[u8], new: &[u8], context: usize) -> String {
    let old = String::from_utf8_lossy(old);
    let new = String::from_utf8_lossy(new);
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old.as_ref(), new.as_ref());

    let mut out = String::new();
    for (idx, group) in diff.grouped_ops(context).iter().enumerate() {
        if idx > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                out.push_str(match change.tag() {
                    ChangeTag::Delete => "- ",
                    ChangeTag::Insert => "+ ",
                    ChangeTag::Equal => "  ",
                });
                out.push_str(&change.value().replace('\r', "\\r"));
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}
