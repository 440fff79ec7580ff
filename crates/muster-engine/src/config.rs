//! Engine configuration.

/// Names and limits the engine applies to every transition.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tag held by every verified participant.
    pub verified_tag: String,

    /// Tag held by participants who have not verified yet.
    pub unverified_tag: String,

    /// Tag held by verified participants who are on no team.
    pub solo_tag: String,

    /// Games a team may be created for. Empty allows any game.
    pub games: Vec<String>,

    /// Maximum team name length in characters.
    pub max_team_name_len: usize,

    /// Channels tried in order for the welcome notice.
    pub welcome_channels: Vec<String>,

    /// Maximum role-slot tags per category.
    pub slot_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verified_tag: "Verified".to_string(),
            unverified_tag: "Unverified".to_string(),
            solo_tag: "Solo".to_string(),
            games: vec![
                "valorant".to_string(),
                "overwatch".to_string(),
                "league".to_string(),
                "rocket-league".to_string(),
            ],
            max_team_name_len: 32,
            welcome_channels: vec!["verify".to_string(), "general".to_string()],
            slot_cap: 2,
        }
    }
}

impl EngineConfig {
    /// Set the allowed games.
    #[must_use]
    pub fn with_games<I, S>(mut self, games: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.games = games.into_iter().map(Into::into).collect();
        self
    }

    /// Set the role-slot cap.
    #[must_use]
    pub fn with_slot_cap(mut self, cap: usize) -> Self {
        self.slot_cap = cap;
        self
    }

    /// Set the welcome channel preference list.
    #[must_use]
    pub fn with_welcome_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.welcome_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve a game name to its configured spelling.
    pub fn canonical_game(&self, game: &str) -> Option<String> {
        let game = game.trim();
        if game.is_empty() {
            return None;
        }
        if self.games.is_empty() {
            return Some(game.to_string());
        }
        self.games
            .iter()
            .find(|g| g.eq_ignore_ascii_case(game))
            .cloned()
    }
}
