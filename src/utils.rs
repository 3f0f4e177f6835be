/// 1-based `(line, column)` of a byte offset, for `file:line:col` notices.
///
/// Columns count characters, not bytes. An offset past the end, or inside a
/// multi-byte character, resolves to the next character boundary.
pub fn get_line_and_column(source: &str, position: usize) -> (usize, usize) {
    let prefix = source
        .char_indices()
        .take_while(|(i, _)| *i < position)
        .map(|(_, c)| c);
    prefix.fold((1, 1), |(line, column), c| match c {
        '\n' => (line + 1, 1),
        _ => (line, column + 1),
    })
}
