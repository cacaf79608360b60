use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    /// Illustration shown while the exercise is active.
    #[serde(default)]
    pub media: String,
}

impl Exercise {
    pub fn new(id: impl Into<String>, name: impl Into<String>, media: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media: media.into(),
        }
    }
}

/// Fixed, ordered sequence of exercises played by a workout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

impl Routine {
    /// Build a routine, rejecting an empty exercise list.
    pub fn new(name: impl Into<String>, exercises: Vec<Exercise>) -> Result<Self, ValidationError> {
        if exercises.is_empty() {
            return Err(ValidationError::EmptyCollection("routine exercises".into()));
        }
        Ok(Self {
            name: name.into(),
            exercises,
        })
    }

    /// The built-in guided meditation routine listed on the home screen.
    pub fn meditera() -> Self {
        let exercises = [1, 3, 4, 5, 6, 7, 8, 9, 10]
            .into_iter()
            .map(|n| {
                Exercise::new(
                    format!("ovning-{n}"),
                    format!("Övning {n}"),
                    format!("images/ovning-{n}"),
                )
            })
            .collect();
        Self {
            name: "Meditera".into(),
            exercises,
        }
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }
}

impl Default for Routine {
    fn default() -> Self {
        Self::meditera()
    }
}
