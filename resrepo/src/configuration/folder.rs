//! Folder configurations: one optional qualifier per axis.

use std::cmp::Ordering;
use std::fmt;

use super::qualifier::{
    parse_region_token, Density, Qualifier, QualifierKind, TokenMatch, QUALIFIER_COUNT,
};
use crate::error::QualifierError;
use crate::resource::ResourceFolderType;

/// The set of qualifiers a resource folder (or a requested device) specifies.
///
/// Unspecified axes are `None`. The default configuration specifies nothing
/// and corresponds to an unqualified folder such as `values/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderConfiguration {
    qualifiers: [Option<Qualifier>; QUALIFIER_COUNT],
}

impl Default for FolderConfiguration {
    fn default() -> Self {
        Self {
            qualifiers: std::array::from_fn(|_| None),
        }
    }
}

impl FolderConfiguration {
    /// Parse qualifier tokens (the dash-separated segments after the base
    /// folder name).
    ///
    /// Tokens must follow precedence order. Any unknown, malformed or
    /// out-of-order token rejects the whole configuration.
    pub fn parse<S: AsRef<str>>(segments: &[S]) -> Result<Self, QualifierError> {
        let mut config = FolderConfiguration::default();
        let mut next_axis = 0usize;
        let mut i = 0usize;

        while i < segments.len() {
            let token = segments[i].as_ref();
            if token.is_empty() {
                return Err(QualifierError::EmptyQualifier);
            }

            let mut matched = None;
            for axis in next_axis..QUALIFIER_COUNT {
                let kind = QualifierKind::ALL[axis];
                if let Some(m) = Qualifier::parse_token(kind, token) {
                    matched = Some((axis, m));
                    break;
                }
            }

            let Some((axis, token_match)) = matched else {
                return Err(Self::classify_rejected(token, next_axis));
            };

            if let TokenMatch::Value(mut qualifier) = token_match {
                // A plain language may be followed by its region token.
                if let Qualifier::Locale(locale) = &mut qualifier {
                    if locale.script.is_none() && locale.region.is_none() {
                        if let Some(region) = segments.get(i + 1).and_then(|t| parse_region_token(t.as_ref())) {
                            locale.region = Some(region);
                            i += 1;
                        }
                    }
                }
                config.qualifiers[axis] = Some(qualifier);
            }
            next_axis = axis + 1;
            i += 1;
        }

        Ok(config)
    }

    fn classify_rejected(token: &str, next_axis: usize) -> QualifierError {
        if parse_region_token(token).is_some() {
            return QualifierError::DanglingRegion(token.to_string());
        }
        let earlier = QualifierKind::ALL[..next_axis]
            .iter()
            .any(|kind| Qualifier::parse_token(*kind, token).is_some());
        if earlier {
            QualifierError::OutOfOrder(token.to_string())
        } else {
            QualifierError::UnknownQualifier(token.to_string())
        }
    }

    /// Parse a full directory name such as `values-fr-rCA-hdpi`.
    pub fn from_folder_name(
        folder_name: &str,
    ) -> Result<(ResourceFolderType, Self), QualifierError> {
        let mut segments = folder_name.split('-');
        let base = segments.next().unwrap_or_default();
        let folder_type = ResourceFolderType::from_name(base)
            .ok_or_else(|| QualifierError::UnknownFolderType(base.to_string()))?;
        let rest: Vec<&str> = segments.collect();
        Ok((folder_type, Self::parse(&rest)?))
    }

    /// Parse a qualifier string without base type, e.g. `fr-rCA-hdpi`.
    ///
    /// The empty string is the default configuration.
    pub fn from_qualifier_string(qualifiers: &str) -> Result<Self, QualifierError> {
        if qualifiers.is_empty() {
            return Ok(Self::default());
        }
        let segments: Vec<&str> = qualifiers.split('-').collect();
        Self::parse(&segments)
    }

    /// The qualifier on one axis.
    pub fn qualifier(&self, kind: QualifierKind) -> Option<&Qualifier> {
        self.qualifiers[kind.index()].as_ref()
    }

    /// Set (or replace) the qualifier on its axis.
    pub fn set(&mut self, qualifier: Qualifier) {
        let index = qualifier.kind().index();
        self.qualifiers[index] = Some(qualifier);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, qualifier: Qualifier) -> Self {
        self.set(qualifier);
        self
    }

    /// Clear one axis.
    pub fn clear(&mut self, kind: QualifierKind) {
        self.qualifiers[kind.index()] = None;
    }

    /// Whether no axis is specified.
    pub fn is_default(&self) -> bool {
        self.qualifiers.iter().all(Option::is_none)
    }

    /// Specified qualifiers, in precedence order.
    pub fn qualifiers(&self) -> impl Iterator<Item = &Qualifier> {
        self.qualifiers.iter().flatten()
    }

    /// Dots-per-inch of the density qualifier, when it is a concrete density.
    pub fn density(&self) -> Option<Density> {
        match self.qualifier(QualifierKind::Density) {
            Some(Qualifier::Density(d)) => Some(*d),
            _ => None,
        }
    }

    /// The language of the locale qualifier.
    pub fn language(&self) -> Option<&str> {
        match self.qualifier(QualifierKind::Locale) {
            Some(Qualifier::Locale(locale)) => Some(&locale.language),
            _ => None,
        }
    }

    /// The region of the locale qualifier.
    pub fn region(&self) -> Option<&str> {
        match self.qualifier(QualifierKind::Locale) {
            Some(Qualifier::Locale(locale)) => locale.region.as_deref(),
            _ => None,
        }
    }

    /// Qualifier tokens joined by `-`, without the folder base name.
    pub fn qualifier_string(&self) -> String {
        self.qualifiers()
            .map(|q| q.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Full folder name for a folder type, e.g. `values-fr-rCA`.
    pub fn folder_name(&self, folder_type: ResourceFolderType) -> String {
        let qualifiers = self.qualifier_string();
        if qualifiers.is_empty() {
            folder_type.name().to_string()
        } else {
            format!("{}-{}", folder_type.name(), qualifiers)
        }
    }
}

impl fmt::Display for FolderConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualifier_string())
    }
}

/// Axis-by-axis order in precedence order; an unspecified axis sorts before
/// a specified one. The default configuration sorts first.
impl Ord for FolderConfiguration {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.qualifiers.iter().zip(other.qualifiers.iter()) {
            let ord = match (a, b) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for FolderConfiguration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::qualifier::{LocaleQualifier, NightMode, Orientation};

    #[test]
    fn test_parse_default() {
        let (folder_type, config) = FolderConfiguration::from_folder_name("values").unwrap();
        assert_eq!(folder_type, ResourceFolderType::Values);
        assert!(config.is_default());
        assert_eq!(config.to_string(), "");
    }

    #[test]
    fn test_parse_locale_with_region() {
        let (_, config) = FolderConfiguration::from_folder_name("values-fr-rCA").unwrap();
        assert_eq!(config.language(), Some("fr"));
        assert_eq!(config.region(), Some("CA"));
        assert_eq!(config.folder_name(ResourceFolderType::Values), "values-fr-rCA");
    }

    #[test]
    fn test_parse_many_axes() {
        let name = "values-mcc310-en-rUS-ldrtl-sw600dp-w720dp-large-long-land-night-xhdpi-finger-keyshidden-nokeys-navhidden-dpad-v21";
        let (_, config) = FolderConfiguration::from_folder_name(name).unwrap();
        assert_eq!(config.folder_name(ResourceFolderType::Values), name);
        assert_eq!(
            config.qualifier(QualifierKind::Orientation),
            Some(&Qualifier::Orientation(Orientation::Landscape))
        );
        assert_eq!(config.density(), Some(Density::XHIGH));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let err = FolderConfiguration::from_folder_name("values-hdpi-fr").unwrap_err();
        assert_eq!(err, QualifierError::OutOfOrder("fr".into()));

        let err = FolderConfiguration::from_folder_name("values-v21-land").unwrap_err();
        assert_eq!(err, QualifierError::OutOfOrder("land".into()));
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        assert!(FolderConfiguration::from_folder_name("values-land-port").is_err());
    }

    #[test]
    fn test_unknown_and_empty_rejected() {
        assert_eq!(
            FolderConfiguration::from_folder_name("values-bogus").unwrap_err(),
            QualifierError::UnknownQualifier("bogus".into())
        );
        assert_eq!(
            FolderConfiguration::from_folder_name("values--fr").unwrap_err(),
            QualifierError::EmptyQualifier
        );
        assert_eq!(
            FolderConfiguration::from_folder_name("assets").unwrap_err(),
            QualifierError::UnknownFolderType("assets".into())
        );
        assert_eq!(
            FolderConfiguration::from_folder_name("values-rCA").unwrap_err(),
            QualifierError::DanglingRegion("rCA".into())
        );
    }

    #[test]
    fn test_zero_dpi_is_no_density() {
        let (_, config) = FolderConfiguration::from_folder_name("drawable-0dpi").unwrap();
        assert!(config.is_default());
        assert_eq!(config.density(), None);
    }

    #[test]
    fn test_display_roundtrips() {
        for name in ["fr-rCA-hdpi", "b+sr+Latn-night", "sw600dp-v21", "port-notnight-anydpi"] {
            let config = FolderConfiguration::from_qualifier_string(name).unwrap();
            assert_eq!(config.to_string(), name);
            assert_eq!(FolderConfiguration::from_qualifier_string(&config.to_string()).unwrap(), config);
        }
    }

    #[test]
    fn test_builder() {
        let config = FolderConfiguration::default()
            .with(Qualifier::Locale(LocaleQualifier::new("de")))
            .with(Qualifier::NightMode(NightMode::Night));
        assert_eq!(config.to_string(), "de-night");
    }

    #[test]
    fn test_ordering_default_first() {
        let default = FolderConfiguration::default();
        let fr = FolderConfiguration::from_qualifier_string("fr").unwrap();
        let fr_ca = FolderConfiguration::from_qualifier_string("fr-rCA").unwrap();
        assert!(default < fr);
        assert!(fr < fr_ca);
    }
}
