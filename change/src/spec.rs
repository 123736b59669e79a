use crate::set::ChangeSet;
use marten_text::Text;

/// Inserted content in a [`ChangeSpec`]: either a plain string, split into
/// lines when the set is built, or an already line-structured document.
#[derive(Debug, Clone)]
pub enum ChangeInsert {
    Str(String),
    Text(Text),
}

impl From<&str> for ChangeInsert {
    fn from(s: &str) -> Self {
        ChangeInsert::Str(s.to_string())
    }
}

impl From<String> for ChangeInsert {
    fn from(s: String) -> Self {
        ChangeInsert::Str(s)
    }
}

impl From<Text> for ChangeInsert {
    fn from(text: Text) -> Self {
        ChangeInsert::Text(text)
    }
}

/// Input to [`ChangeSet::of`]: a single replacement, an existing set, or a
/// nested batch.
#[derive(Debug, Clone)]
pub enum ChangeSpec {
    Change {
        from: usize,
        to: usize,
        insert: Option<ChangeInsert>,
    },
    Set(ChangeSet),
    List(Vec<ChangeSpec>),
}

impl ChangeSpec {
    /// Replace `from..to` with the given content.
    pub fn replace(from: usize, to: usize, insert: impl Into<ChangeInsert>) -> ChangeSpec {
        ChangeSpec::Change {
            from,
            to,
            insert: Some(insert.into()),
        }
    }

    /// Insert content at a position.
    pub fn insert(pos: usize, insert: impl Into<ChangeInsert>) -> ChangeSpec {
        ChangeSpec::replace(pos, pos, insert)
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> ChangeSpec {
        ChangeSpec::Change {
            from,
            to,
            insert: None,
        }
    }
}

impl From<ChangeSet> for ChangeSpec {
    fn from(set: ChangeSet) -> Self {
        ChangeSpec::Set(set)
    }
}

impl From<Vec<ChangeSpec>> for ChangeSpec {
    fn from(specs: Vec<ChangeSpec>) -> Self {
        ChangeSpec::List(specs)
    }
}
