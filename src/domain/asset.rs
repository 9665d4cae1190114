use serde::{Deserialize, Serialize};
use std::fmt;

/// A tradable asset symbol such as `BTC`.
///
/// Symbols are normalised to upper case so that user input like `btc`
/// compares equal to the configured symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered set of assets the desk trades.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
}

impl AssetCatalog {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    /// Resolves free-form user input to a supported asset.
    pub fn parse(&self, input: &str) -> Option<Asset> {
        let candidate = Asset::new(input);
        self.assets.iter().find(|a| **a == candidate).cloned()
    }

    pub fn contains(&self, asset: &Asset) -> bool {
        self.assets.contains(asset)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

/// Direction of a request relative to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The user acquires the asset and pays in the quote currency.
    Buy,
    /// The user disposes of the asset and is paid in the quote currency.
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("buy"),
            Direction::Sell => f.write_str("sell"),
        }
    }
}

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Russian,
    Armenian,
    English,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Russian, Language::Armenian, Language::English];

    /// Recognises the language keyboard labels as well as bare names and codes.
    pub fn from_token(input: &str) -> Option<Self> {
        let token = input.trim();
        let lowered = token.to_lowercase();
        Self::ALL.into_iter().find(|lang| {
            token == lang.keyboard_label()
                || lowered == lang.native_name().to_lowercase()
                || lowered == lang.code()
                || lowered == lang.english_name()
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Russian => "ru",
            Language::Armenian => "hy",
            Language::English => "en",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Language::Russian => "Русский",
            Language::Armenian => "Հայերեն",
            Language::English => "English",
        }
    }

    fn english_name(self) -> &'static str {
        match self {
            Language::Russian => "russian",
            Language::Armenian => "armenian",
            Language::English => "english",
        }
    }

    pub fn keyboard_label(self) -> &'static str {
        match self {
            Language::Russian => "🇷🇺 Русский",
            Language::Armenian => "🇦🇲 Հայերեն",
            Language::English => "🇬🇧 English",
        }
    }
}

/// A choice made on the action menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Trade(Direction),
    Back,
}

impl MenuChoice {
    const BUY_WORDS: [&'static str; 3] = ["Купить", "Buy", "Գնել"];
    const SELL_WORDS: [&'static str; 3] = ["Продать", "Sell", "Վաճառել"];
    const BACK_WORDS: [&'static str; 4] = ["⬅️", "Back", "Назад", "Վերադառնալ"];

    /// Menu buttons carry decorations ("💰 Buy BTC/ETH"), so matching is by keyword.
    pub fn from_token(input: &str) -> Option<Self> {
        let text = input.trim();
        let has = |words: &[&str]| {
            words
                .iter()
                .any(|w| text.to_lowercase().contains(&w.to_lowercase()))
        };
        if has(&Self::BUY_WORDS) {
            Some(MenuChoice::Trade(Direction::Buy))
        } else if has(&Self::SELL_WORDS) {
            Some(MenuChoice::Trade(Direction::Sell))
        } else if has(&Self::BACK_WORDS) {
            Some(MenuChoice::Back)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_normalisation() {
        let catalog = AssetCatalog::new(vec![Asset::new("BTC"), Asset::new("ETH")]);
        assert_eq!(catalog.parse(" btc "), Some(Asset::new("BTC")));
        assert_eq!(catalog.parse("Eth"), Some(Asset::new("ETH")));
        assert_eq!(catalog.parse("DOGE"), None);
    }

    #[test]
    fn test_language_tokens() {
        assert_eq!(Language::from_token("🇬🇧 English"), Some(Language::English));
        assert_eq!(Language::from_token("Русский"), Some(Language::Russian));
        assert_eq!(Language::from_token("hy"), Some(Language::Armenian));
        assert_eq!(Language::from_token("Klingon"), None);
    }

    #[test]
    fn test_menu_tokens() {
        assert_eq!(
            MenuChoice::from_token("💰 Купить BTC/ETH"),
            Some(MenuChoice::Trade(Direction::Buy))
        );
        assert_eq!(
            MenuChoice::from_token("sell"),
            Some(MenuChoice::Trade(Direction::Sell))
        );
        assert_eq!(MenuChoice::from_token("⬅️ Назад"), Some(MenuChoice::Back));
        assert_eq!(MenuChoice::from_token("hello"), None);
    }
}
