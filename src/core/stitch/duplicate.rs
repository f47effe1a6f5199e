/// 原始截图字节级去重：滚动后画面没变化即说明已到底部
pub struct DuplicateDetector {
    last_raw: Option<Vec<u8>>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self { last_raw: None }
    }

    /// Returns true when `raw` is byte-identical to the last accepted capture.
    /// Non-duplicates become the new reference.
    pub fn is_duplicate(&mut self, raw: &[u8]) -> bool {
        if let Some(last) = &self.last_raw {
            if is_byte_identical(last, raw) {
                return true;
            }
        }

        self.last_raw = Some(raw.to_vec());
        false
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_byte_identical(a: &[u8], b: &[u8]) -> bool {
    a == b
}
