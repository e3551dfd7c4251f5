/// Topic names under one base prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub set: String,
    pub override_position: String,
    pub switch: String,
    pub status: String,
    pub position: String,
    pub raw_position: String,
}

impl Topics {
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            set: format!("{base}/position/set"),
            override_position: format!("{base}/position/override"),
            switch: format!("{base}/switch"),
            status: format!("{base}/status"),
            position: format!("{base}/position"),
            raw_position: format!("{base}/raw_position"),
        }
    }

    /// Topics the desk listens on.
    pub fn inbound(&self) -> [&str; 3] {
        [&self.set, &self.override_position, &self.switch]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_ignored() {
        let t = Topics::new("office/desk/");
        assert_eq!(t.set, "office/desk/position/set");
        assert_eq!(t.raw_position, "office/desk/raw_position");
        assert_eq!(
            t.inbound(),
            [
                "office/desk/position/set",
                "office/desk/position/override",
                "office/desk/switch"
            ]
        );
    }
}
