use super::command::{CommandKind, VoiceCommand};
use super::normalize::normalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabEntry {
    /// Normalized alias text.
    pub alias: String,
    pub kind: CommandKind,
}

/// Ordered alias table for one module.
///
/// Declaration order is significant: when two entries carry the same alias the
/// first one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push_aliases`](Self::push_aliases).
    #[must_use]
    pub fn with<'a>(mut self, kind: CommandKind, aliases: impl IntoIterator<Item = &'a str>) -> Self {
        self.push_aliases(kind, aliases);
        self
    }

    pub fn push_aliases<'a>(&mut self, kind: CommandKind, aliases: impl IntoIterator<Item = &'a str>) {
        for alias in aliases {
            let alias = normalize(alias);
            if alias.is_empty() {
                continue;
            }
            self.entries.push(VocabEntry { alias, kind });
        }
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact alias lookup on already-normalized text.
    pub fn lookup(&self, normalized: &str) -> Option<CommandKind> {
        self.entries
            .iter()
            .find(|e| e.alias == normalized)
            .map(|e| e.kind)
    }

    /// Resolve a normalized transcript against this table.
    ///
    /// 1. exact alias match (first declared wins)
    /// 2. the first declared `names` entry contained in the text
    /// 3. a free answer, when the controller accepts answers
    pub fn resolve(
        &self,
        normalized: &str,
        names: &[String],
        accepts_answers: bool,
    ) -> Option<VoiceCommand> {
        if normalized.is_empty() {
            return None;
        }
        if let Some(kind) = self.lookup(normalized) {
            return Some(kind.into());
        }
        if let Some(name) = names
            .iter()
            .find(|n| contains_phrase(normalized, &normalize(n)))
        {
            return Some(VoiceCommand::SelectByName(name.clone()));
        }
        accepts_answers.then(|| VoiceCommand::Answer(normalized.to_string()))
    }
}

/// Case-insensitive substring containment; `_` in a name reads as a space.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let needle = needle.replace('_', " ");
    !needle.is_empty() && haystack.replace('_', " ").contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance() -> Vocabulary {
        Vocabulary::new()
            .with(CommandKind::Start, ["start", "go"])
            .with(CommandKind::AddError, ["error", "add error"])
            .with(CommandKind::Stop, ["error"])
    }

    #[test]
    fn first_declared_alias_wins() {
        assert_eq!(balance().lookup("error"), Some(CommandKind::AddError));
    }

    #[test]
    fn aliases_are_normalized_on_insert() {
        let v = Vocabulary::new().with(CommandKind::Skip, ["  Skip Test. "]);
        assert_eq!(v.lookup("skip test"), Some(CommandKind::Skip));
    }

    #[test]
    fn names_match_by_containment_in_declaration_order() {
        let names = vec!["single_leg".to_string(), "tandem".to_string()];
        let v = balance();
        for said in ["now tandem stance", "tandems", "tandemstance"] {
            assert_eq!(
                v.resolve(said, &names, false),
                Some(VoiceCommand::SelectByName("tandem".into())),
                "{said}"
            );
        }
        assert_eq!(
            v.resolve("single leg", &names, false),
            Some(VoiceCommand::SelectByName("single_leg".into()))
        );
        // both names present: the first declared wins
        assert_eq!(
            v.resolve("tandem then single leg", &names, false),
            Some(VoiceCommand::SelectByName("single_leg".into()))
        );
        assert_eq!(v.resolve("double", &names, false), None);
    }

    #[test]
    fn literal_beats_answer() {
        let v = Vocabulary::new().with(CommandKind::Complete, ["done"]);
        assert_eq!(v.resolve("done", &[], true), Some(VoiceCommand::Complete));
        assert_eq!(
            v.resolve("apple ball done", &[], true),
            Some(VoiceCommand::Answer("apple ball done".into()))
        );
        assert_eq!(v.resolve("apple", &[], false), None);
    }
}
