/// Bytes read from the network that do not yet form a complete line.
///
/// Splitting happens on raw bytes so that a UTF-8 sequence cut by a network read is
/// only decoded once its line is complete.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    pending: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and returns every line it completed, in order, without the
    /// terminating `\n`. The unterminated remainder stays buffered for the next call.
    pub fn push(&mut self, fragment: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(fragment);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let remainder = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, remainder);

        complete[..complete.len() - 1]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops whatever partial line is left, returning how many bytes were discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unterminated_tail() {
        let mut buffer = ReceiveBuffer::new();

        assert_eq!(buffer.push(b"data: {\"a\"").len(), 0);
        assert_eq!(buffer.pending(), b"data: {\"a\"");

        let lines = buffer.push(b":1}\ndata: {");
        assert_eq!(lines, vec!["data: {\"a\":1}".to_string()]);
        assert_eq!(buffer.pending(), b"data: {");
    }

    #[test]
    fn yields_blank_lines_between_events() {
        let mut buffer = ReceiveBuffer::new();
        let lines = buffer.push(b"data: 1\n\ndata: 2\n\n");
        assert_eq!(lines, vec!["data: 1", "", "data: 2", ""]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn reassembles_multibyte_characters_split_across_reads() {
        let text = "data: café\n".as_bytes();
        // split inside the two-byte 'é'
        let cut = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut buffer = ReceiveBuffer::new();
        assert!(buffer.push(&text[..cut]).is_empty());
        assert_eq!(buffer.push(&text[cut..]), vec!["data: café".to_string()]);
    }

    #[test]
    fn discard_reports_dropped_bytes() {
        let mut buffer = ReceiveBuffer::new();
        buffer.push(b"done\npartial");
        assert_eq!(buffer.discard(), 7);
        assert!(buffer.is_empty());
    }
}
