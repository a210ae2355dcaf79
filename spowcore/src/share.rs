/// Prefix marking a share target as routable through this bridge.
pub const TARGET_PREFIX: &str = "wa:";

/// A staged message and the raw targets it should be relayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareJob {
    pub body: String,
    pub targets: Vec<String>,
}

impl ShareJob {
    /// `body` is the staged file content, `target_line` a comma separated
    /// list such as `wa:123@s.whatsapp.net, tg:456`.
    pub fn new(body: &str, target_line: &str) -> Self {
        Self {
            body: body.trim().to_string(),
            targets: target_line
                .split(',')
                .map(|t| t.trim().to_string())
                .collect(),
        }
    }

    /// Targets carrying [`TARGET_PREFIX`], prefix stripped, in input order.
    pub fn routable_targets(&self) -> impl Iterator<Item = &str> {
        self.targets
            .iter()
            .filter_map(|t| t.strip_prefix(TARGET_PREFIX))
    }
}
