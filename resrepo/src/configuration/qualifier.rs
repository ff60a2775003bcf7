//! Individual configuration qualifiers.
//!
//! A resource folder name is a base type followed by dash-separated tokens,
//! each naming a value on one configuration axis:
//!
//! ```text
//! values-mcc310-fr-rCA-sw600dp-land-night-hdpi-v21
//!        |      |      |       |    |     |    +-- Version
//!        |      |      |       |    |     +------- Density
//!        |      |      |       |    +------------- NightMode
//!        |      |      |       +------------------ Orientation
//!        |      |      +-------------------------- SmallestScreenWidth
//!        |      +--------------------------------- Locale (two tokens)
//!        +---------------------------------------- CountryCode
//! ```
//!
//! [`QualifierKind`] enumerates the axes in precedence order. That order is
//! both the order tokens must appear in and the order best-match resolution
//! eliminates candidates in.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Number of configuration axes.
pub const QUALIFIER_COUNT: usize = 20;

/// A configuration axis, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualifierKind {
    CountryCode,
    NetworkCode,
    Locale,
    LayoutDirection,
    SmallestScreenWidth,
    ScreenWidth,
    ScreenHeight,
    ScreenSize,
    ScreenRatio,
    ScreenRound,
    Orientation,
    UiMode,
    NightMode,
    Density,
    Touchscreen,
    KeyboardState,
    TextInput,
    NavigationState,
    Navigation,
    Version,
}

impl QualifierKind {
    /// All axes in precedence order.
    pub const ALL: [QualifierKind; QUALIFIER_COUNT] = [
        QualifierKind::CountryCode,
        QualifierKind::NetworkCode,
        QualifierKind::Locale,
        QualifierKind::LayoutDirection,
        QualifierKind::SmallestScreenWidth,
        QualifierKind::ScreenWidth,
        QualifierKind::ScreenHeight,
        QualifierKind::ScreenSize,
        QualifierKind::ScreenRatio,
        QualifierKind::ScreenRound,
        QualifierKind::Orientation,
        QualifierKind::UiMode,
        QualifierKind::NightMode,
        QualifierKind::Density,
        QualifierKind::Touchscreen,
        QualifierKind::KeyboardState,
        QualifierKind::TextInput,
        QualifierKind::NavigationState,
        QualifierKind::Navigation,
        QualifierKind::Version,
    ];

    /// Position of the axis in precedence order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Range axes accept any candidate value not exceeding the target.
    pub fn is_range(self) -> bool {
        matches!(
            self,
            QualifierKind::SmallestScreenWidth
                | QualifierKind::ScreenWidth
                | QualifierKind::ScreenHeight
                | QualifierKind::ScreenSize
                | QualifierKind::Version
        )
    }
}

// =============================================================================
// Enumerated qualifier values
// =============================================================================

macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }
    };
}

token_enum!(
    /// `ldltr` / `ldrtl`.
    LayoutDirection { Ltr => "ldltr", Rtl => "ldrtl" }
);

token_enum!(
    /// Screen size bucket. Ordered, so it behaves as a range axis.
    ScreenSize { Small => "small", Normal => "normal", Large => "large", XLarge => "xlarge" }
);

token_enum!(
    ScreenRatio { NotLong => "notlong", Long => "long" }
);

token_enum!(
    ScreenRound { NotRound => "notround", Round => "round" }
);

token_enum!(
    Orientation { Portrait => "port", Landscape => "land", Square => "square" }
);

token_enum!(
    UiMode {
        Car => "car",
        Desk => "desk",
        Television => "television",
        Appliance => "appliance",
        Watch => "watch",
        VrHeadset => "vrheadset",
    }
);

token_enum!(
    NightMode { NotNight => "notnight", Night => "night" }
);

token_enum!(
    Touchscreen { NoTouch => "notouch", Stylus => "stylus", Finger => "finger" }
);

token_enum!(
    KeyboardState { Exposed => "keysexposed", Hidden => "keyshidden", Soft => "keyssoft" }
);

token_enum!(
    TextInput { NoKeys => "nokeys", Qwerty => "qwerty", TwelveKey => "12key" }
);

token_enum!(
    NavigationState { Exposed => "navexposed", Hidden => "navhidden" }
);

token_enum!(
    Navigation { NoNav => "nonav", Dpad => "dpad", Trackball => "trackball", Wheel => "wheel" }
);

// =============================================================================
// Density
// =============================================================================

/// Named density buckets and their dots-per-inch.
pub const NAMED_DENSITIES: &[(&str, u32)] = &[
    ("ldpi", 120),
    ("mdpi", 160),
    ("tvdpi", 213),
    ("hdpi", 240),
    ("xhdpi", 320),
    ("xxhdpi", 480),
    ("xxxhdpi", 640),
];

/// Screen density qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Density {
    /// A concrete density in dots per inch. Never zero.
    Dpi(u32),
    /// Density-independent resources, never scaled.
    NoDpi,
    /// Vector resources usable at any density.
    AnyDpi,
}

impl Density {
    pub const LOW: Density = Density::Dpi(120);
    pub const MEDIUM: Density = Density::Dpi(160);
    pub const HIGH: Density = Density::Dpi(240);
    pub const XHIGH: Density = Density::Dpi(320);
    pub const XXHIGH: Density = Density::Dpi(480);
    pub const XXXHIGH: Density = Density::Dpi(640);

    /// Dots per inch, or `None` for `nodpi` / `anydpi`.
    pub fn dpi(self) -> Option<u32> {
        match self {
            Density::Dpi(dpi) => Some(dpi),
            _ => None,
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Density::NoDpi => f.write_str("nodpi"),
            Density::AnyDpi => f.write_str("anydpi"),
            Density::Dpi(dpi) => match NAMED_DENSITIES.iter().find(|(_, v)| v == dpi) {
                Some((name, _)) => f.write_str(name),
                None => write!(f, "{}dpi", dpi),
            },
        }
    }
}

// =============================================================================
// Locale
// =============================================================================

/// Language with optional script and region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocaleQualifier {
    pub language: String,
    pub script: Option<String>,
    pub region: Option<String>,
}

impl LocaleQualifier {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            script: None,
            region: None,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_ascii_uppercase());
        self
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.script = Some(title_case(script));
        self
    }

    /// Parse a BCP-47 token such as `b+sr+Latn+RS`.
    fn parse_bcp47(token: &str) -> Option<Self> {
        let rest = token.strip_prefix("b+")?;
        let mut parts = rest.split('+');
        let language = parts.next()?.to_ascii_lowercase();
        if !language_pattern().is_match(&language) {
            return None;
        }
        let mut locale = LocaleQualifier::new(&language);
        for part in parts {
            if part.len() == 4 && part.chars().all(|c| c.is_ascii_alphabetic()) && locale.script.is_none() {
                locale = locale.with_script(part);
            } else if is_region_code(part) && locale.region.is_none() {
                locale = locale.with_region(part);
            } else {
                return None;
            }
        }
        Some(locale)
    }
}

impl fmt::Display for LocaleQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.script, &self.region) {
            (Some(script), region) => {
                write!(f, "b+{}+{}", self.language, script)?;
                if let Some(region) = region {
                    write!(f, "+{}", region)?;
                }
                Ok(())
            }
            (None, Some(region)) => write!(f, "{}-r{}", self.language, region),
            (None, None) => f.write_str(&self.language),
        }
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if i == 0 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

fn is_region_code(s: &str) -> bool {
    (s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
        || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
}

static LANGUAGE_PATTERN: OnceLock<Regex> = OnceLock::new();
static REGION_PATTERN: OnceLock<Regex> = OnceLock::new();
static NUMERIC_PATTERN: OnceLock<Regex> = OnceLock::new();

fn language_pattern() -> &'static Regex {
    LANGUAGE_PATTERN.get_or_init(|| Regex::new(r"^[a-z]{2,3}$").unwrap())
}

fn region_pattern() -> &'static Regex {
    REGION_PATTERN.get_or_init(|| Regex::new(r"^r([A-Z]{2}|[0-9]{3})$").unwrap())
}

/// Prefix, digits, suffix: `mcc310`, `sw600dp`, `v21`, `320dpi`.
fn numeric_pattern() -> &'static Regex {
    NUMERIC_PATTERN.get_or_init(|| Regex::new(r"^(mcc|mnc|sw|w|h|v|)([0-9]+)(dp|dpi|)$").unwrap())
}

/// Whether `token` is a locale region token such as `rCA` or `r419`.
pub fn parse_region_token(token: &str) -> Option<String> {
    region_pattern()
        .captures(token)
        .map(|caps| caps[1].to_ascii_uppercase())
}

// =============================================================================
// Qualifier
// =============================================================================

/// A value on one configuration axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Qualifier {
    CountryCode(u16),
    NetworkCode(u16),
    Locale(LocaleQualifier),
    LayoutDirection(LayoutDirection),
    SmallestScreenWidth(u32),
    ScreenWidth(u32),
    ScreenHeight(u32),
    ScreenSize(ScreenSize),
    ScreenRatio(ScreenRatio),
    ScreenRound(ScreenRound),
    Orientation(Orientation),
    UiMode(UiMode),
    NightMode(NightMode),
    Density(Density),
    Touchscreen(Touchscreen),
    KeyboardState(KeyboardState),
    TextInput(TextInput),
    NavigationState(NavigationState),
    Navigation(Navigation),
    Version(u32),
}

/// Result of trying one token against one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenMatch {
    /// The token sets this qualifier.
    Value(Qualifier),
    /// The token belongs to this axis but sets nothing (`0dpi`).
    Neutral,
}

impl Qualifier {
    /// The axis this value lives on.
    pub fn kind(&self) -> QualifierKind {
        match self {
            Qualifier::CountryCode(_) => QualifierKind::CountryCode,
            Qualifier::NetworkCode(_) => QualifierKind::NetworkCode,
            Qualifier::Locale(_) => QualifierKind::Locale,
            Qualifier::LayoutDirection(_) => QualifierKind::LayoutDirection,
            Qualifier::SmallestScreenWidth(_) => QualifierKind::SmallestScreenWidth,
            Qualifier::ScreenWidth(_) => QualifierKind::ScreenWidth,
            Qualifier::ScreenHeight(_) => QualifierKind::ScreenHeight,
            Qualifier::ScreenSize(_) => QualifierKind::ScreenSize,
            Qualifier::ScreenRatio(_) => QualifierKind::ScreenRatio,
            Qualifier::ScreenRound(_) => QualifierKind::ScreenRound,
            Qualifier::Orientation(_) => QualifierKind::Orientation,
            Qualifier::UiMode(_) => QualifierKind::UiMode,
            Qualifier::NightMode(_) => QualifierKind::NightMode,
            Qualifier::Density(_) => QualifierKind::Density,
            Qualifier::Touchscreen(_) => QualifierKind::Touchscreen,
            Qualifier::KeyboardState(_) => QualifierKind::KeyboardState,
            Qualifier::TextInput(_) => QualifierKind::TextInput,
            Qualifier::NavigationState(_) => QualifierKind::NavigationState,
            Qualifier::Navigation(_) => QualifierKind::Navigation,
            Qualifier::Version(_) => QualifierKind::Version,
        }
    }

    /// Try to read `token` as a value on axis `kind`.
    ///
    /// Locale region tokens (`rCA`) are not handled here; the folder parser
    /// attaches them to the preceding language.
    pub(crate) fn parse_token(kind: QualifierKind, token: &str) -> Option<TokenMatch> {
        let value = match kind {
            QualifierKind::CountryCode => numeric(token, "mcc", "")
                .filter(|n| *n <= u16::MAX as u64)
                .map(|n| Qualifier::CountryCode(n as u16)),
            QualifierKind::NetworkCode => numeric(token, "mnc", "")
                .filter(|n| *n <= u16::MAX as u64)
                .map(|n| Qualifier::NetworkCode(n as u16)),
            QualifierKind::Locale => {
                if token.starts_with("b+") {
                    LocaleQualifier::parse_bcp47(token).map(Qualifier::Locale)
                } else if language_pattern().is_match(token) && !is_reserved_token(token) {
                    Some(Qualifier::Locale(LocaleQualifier::new(token)))
                } else {
                    None
                }
            }
            QualifierKind::LayoutDirection => {
                LayoutDirection::from_token(token).map(Qualifier::LayoutDirection)
            }
            QualifierKind::SmallestScreenWidth => {
                numeric_u32(token, "sw", "dp").map(Qualifier::SmallestScreenWidth)
            }
            QualifierKind::ScreenWidth => numeric_u32(token, "w", "dp").map(Qualifier::ScreenWidth),
            QualifierKind::ScreenHeight => {
                numeric_u32(token, "h", "dp").map(Qualifier::ScreenHeight)
            }
            QualifierKind::ScreenSize => ScreenSize::from_token(token).map(Qualifier::ScreenSize),
            QualifierKind::ScreenRatio => ScreenRatio::from_token(token).map(Qualifier::ScreenRatio),
            QualifierKind::ScreenRound => ScreenRound::from_token(token).map(Qualifier::ScreenRound),
            QualifierKind::Orientation => Orientation::from_token(token).map(Qualifier::Orientation),
            QualifierKind::UiMode => UiMode::from_token(token).map(Qualifier::UiMode),
            QualifierKind::NightMode => NightMode::from_token(token).map(Qualifier::NightMode),
            QualifierKind::Density => return parse_density(token),
            QualifierKind::Touchscreen => Touchscreen::from_token(token).map(Qualifier::Touchscreen),
            QualifierKind::KeyboardState => {
                KeyboardState::from_token(token).map(Qualifier::KeyboardState)
            }
            QualifierKind::TextInput => TextInput::from_token(token).map(Qualifier::TextInput),
            QualifierKind::NavigationState => {
                NavigationState::from_token(token).map(Qualifier::NavigationState)
            }
            QualifierKind::Navigation => Navigation::from_token(token).map(Qualifier::Navigation),
            QualifierKind::Version => numeric_u32(token, "v", "").map(Qualifier::Version),
        };
        value.map(TokenMatch::Value)
    }
}

fn parse_density(token: &str) -> Option<TokenMatch> {
    match token {
        "nodpi" => return Some(TokenMatch::Value(Qualifier::Density(Density::NoDpi))),
        "anydpi" => return Some(TokenMatch::Value(Qualifier::Density(Density::AnyDpi))),
        _ => {}
    }
    if let Some((_, dpi)) = NAMED_DENSITIES.iter().find(|(name, _)| *name == token) {
        return Some(TokenMatch::Value(Qualifier::Density(Density::Dpi(*dpi))));
    }
    match numeric_u32(token, "", "dpi") {
        Some(0) => Some(TokenMatch::Neutral),
        Some(dpi) => Some(TokenMatch::Value(Qualifier::Density(Density::Dpi(dpi)))),
        None => None,
    }
}

fn numeric(token: &str, prefix: &str, suffix: &str) -> Option<u64> {
    let caps = numeric_pattern().captures(token)?;
    if &caps[1] != prefix || &caps[3] != suffix {
        return None;
    }
    caps[2].parse().ok()
}

fn numeric_u32(token: &str, prefix: &str, suffix: &str) -> Option<u32> {
    numeric(token, prefix, suffix).and_then(|n| u32::try_from(n).ok())
}

/// Short tokens claimed by a non-locale axis (`car` is a ui mode, not a
/// language).
fn is_reserved_token(token: &str) -> bool {
    QualifierKind::ALL
        .iter()
        .filter(|kind| **kind != QualifierKind::Locale)
        .any(|kind| Qualifier::parse_token(*kind, token).is_some())
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::CountryCode(mcc) => write!(f, "mcc{:03}", mcc),
            Qualifier::NetworkCode(mnc) => write!(f, "mnc{:02}", mnc),
            Qualifier::Locale(locale) => write!(f, "{}", locale),
            Qualifier::LayoutDirection(v) => f.write_str(v.token()),
            Qualifier::SmallestScreenWidth(dp) => write!(f, "sw{}dp", dp),
            Qualifier::ScreenWidth(dp) => write!(f, "w{}dp", dp),
            Qualifier::ScreenHeight(dp) => write!(f, "h{}dp", dp),
            Qualifier::ScreenSize(v) => f.write_str(v.token()),
            Qualifier::ScreenRatio(v) => f.write_str(v.token()),
            Qualifier::ScreenRound(v) => f.write_str(v.token()),
            Qualifier::Orientation(v) => f.write_str(v.token()),
            Qualifier::UiMode(v) => f.write_str(v.token()),
            Qualifier::NightMode(v) => f.write_str(v.token()),
            Qualifier::Density(v) => write!(f, "{}", v),
            Qualifier::Touchscreen(v) => f.write_str(v.token()),
            Qualifier::KeyboardState(v) => f.write_str(v.token()),
            Qualifier::TextInput(v) => f.write_str(v.token()),
            Qualifier::NavigationState(v) => f.write_str(v.token()),
            Qualifier::Navigation(v) => f.write_str(v.token()),
            Qualifier::Version(v) => write!(f, "v{}", v),
        }
    }
}
