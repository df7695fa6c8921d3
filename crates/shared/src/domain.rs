use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a taxonomy entity at any hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One rung of the course/semester/subject/unit/topic hierarchy,
/// totally ordered parent-to-child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Course,
    Semester,
    Subject,
    Unit,
    Topic,
}

impl Level {
    /// All levels in hierarchy order, root first.
    pub const ALL: [Level; 5] = [
        Level::Course,
        Level::Semester,
        Level::Subject,
        Level::Unit,
        Level::Topic,
    ];

    pub fn index(self) -> usize {
        match self {
            Level::Course => 0,
            Level::Semester => 1,
            Level::Subject => 2,
            Level::Unit => 3,
            Level::Topic => 4,
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self.index() {
            0 => None,
            idx => Some(Level::ALL[idx - 1]),
        }
    }

    pub fn child(self) -> Option<Level> {
        Level::ALL.get(self.index() + 1).copied()
    }

    /// Every level strictly below `self`, nearest first.
    pub fn descendants(self) -> &'static [Level] {
        &Level::ALL[self.index() + 1..]
    }

    pub fn descriptor(self) -> &'static LevelDescriptor {
        &LEVELS[self.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Course => "course",
            Level::Semester => "semester",
            Level::Subject => "subject",
            Level::Unit => "unit",
            Level::Topic => "topic",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one hierarchy level. The descriptor table drives
/// all fetch and create behavior; no per-level special cases exist outside
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDescriptor {
    pub level: Level,
    pub parent: Option<Level>,
    /// URL collection segment, e.g. `courses` in `/api/courses`.
    pub collection: &'static str,
    pub create_path: &'static str,
    /// JSON field carrying the parent id in create bodies; `None` for the root.
    pub parent_field: Option<&'static str>,
}

pub const LEVELS: [LevelDescriptor; 5] = [
    LevelDescriptor {
        level: Level::Course,
        parent: None,
        collection: "courses",
        create_path: "/api/courses",
        parent_field: None,
    },
    LevelDescriptor {
        level: Level::Semester,
        parent: Some(Level::Course),
        collection: "semesters",
        create_path: "/api/semesters",
        parent_field: Some("course_id"),
    },
    LevelDescriptor {
        level: Level::Subject,
        parent: Some(Level::Semester),
        collection: "subjects",
        create_path: "/api/subjects",
        parent_field: Some("semester_id"),
    },
    LevelDescriptor {
        level: Level::Unit,
        parent: Some(Level::Subject),
        collection: "units",
        create_path: "/api/units",
        parent_field: Some("subject_id"),
    },
    LevelDescriptor {
        level: Level::Topic,
        parent: Some(Level::Unit),
        collection: "topics",
        create_path: "/api/topics",
        parent_field: Some("unit_id"),
    },
];

impl LevelDescriptor {
    /// Read path for this level's option list, parameterized by the parent
    /// selection. Returns `None` when a parent is required but absent.
    pub fn read_path(&self, parent_id: Option<EntityId>) -> Option<String> {
        match (self.parent, parent_id) {
            (None, _) => Some(format!("/api/{}", self.collection)),
            (Some(parent), Some(id)) => Some(format!(
                "/api/{}/{}/{}",
                parent.descriptor().collection,
                id.0,
                self.collection
            )),
            (Some(_), None) => None,
        }
    }
}
