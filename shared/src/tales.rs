//! Catalog of tale starting points: the opening scene shown before the
//! first turn and a synopsis of the source tale, handed to the prompt
//! builder as context for the generation call.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaleInfo {
    pub id: String,
    pub title: String,
    /// Opening scene shown to the reader before the first turn.
    pub opening: String,
    #[serde(rename = "firstChoice")]
    pub first_choice: String,
    /// Condensed retelling of the source tale, used as prompt context.
    pub synopsis: String,
}

static BUILTIN_TALES: Lazy<Vec<TaleInfo>> = Lazy::new(|| {
    vec![
        TaleInfo {
            id: "redridinghood".into(),
            title: "Little Red Riding Hood".into(),
            opening: "Once upon a time there was a sweet little girl whom everyone loved, \
but most of all her grandmother, who once gave her a little cap of red velvet. Because it \
suited her so well she would wear nothing else, and so she was called Little Red Riding \
Hood. One morning her mother said: take this cake and this bottle of wine to your \
grandmother, she is ill and weak; walk nicely, do not stray from the path, and greet her \
kindly when you enter her room."
                .into(),
            first_choice: "Take the basket for grandmother and leave the house.".into(),
            synopsis: "A girl in a red cap carries cake and wine to her sick grandmother who \
lives deep in the forest. On the way she talks to a wolf, who learns where she is going, \
hurries ahead, swallows the grandmother and takes her place in bed. The girl wonders at the \
grandmother's big ears, eyes and mouth before the wolf swallows her too. A passing huntsman \
hears the wolf snoring, cuts it open and frees them both, and the wolf's belly is filled \
with stones. The tale warns against straying from the path and speaking to strangers."
                .into(),
        },
        TaleInfo {
            id: "neo_kyoto_mystery".into(),
            title: "The Neo-Kyoto Files".into(),
            opening: "You are a detective on Neo-Kyoto Station in the year 2242. An \
anonymous tip about a data breach at the powerful Chronos Corporation has just reached \
you, pointing toward the neon-soaked corridors of Sector 7."
                .into(),
            first_choice: "Head to Sector 7 and investigate the location from the tip.".into(),
            synopsis: "A lone detective on an orbital city-station untangles a conspiracy \
around the Chronos Corporation, whose stolen data hides an experiment the company would \
kill to keep quiet. Informants, corporate enforcers and an old rival cross the detective's \
path before the truth about Sector 7 comes to light."
                .into(),
        },
        TaleInfo {
            id: "blackwood_manor".into(),
            title: "A Night at Blackwood Manor".into(),
            opening: "You are an investigator of the paranormal, invited to the infamous \
Blackwood estate, a sprawling Victorian manor with a dark history of disappearances. The \
current owner has offered a considerable reward to anyone who can spend a whole night \
there and document the strange occurrences."
                .into(),
            first_choice: "Accept the invitation and arrive at the manor at dusk.".into(),
            synopsis: "An old manor swallows its guests: doors that lock themselves, a \
portrait gallery of owners who never left, and a cellar nobody has mapped. Those who \
stayed the night speak of whispers in the walls and a clock that strikes thirteen. The \
reward has never been claimed."
                .into(),
        },
        TaleInfo {
            id: "deep_sea_descent".into(),
            title: "Descent into the Trench".into(),
            opening: "You are a marine biologist aboard the research vessel Poseidon, \
investigating reports of unusual bioluminescent activity in the deepest trench of the \
ocean. Your team has built a submersible that can withstand the crushing pressure, and \
you have been chosen to pilot the first descent."
                .into(),
            first_choice: "Board the submersible and begin your descent into the dark.".into(),
            synopsis: "A research crew follows impossible lights into a deep-sea trench. \
The deeper the submersible sinks, the stranger the life outside its portholes becomes, \
until the lights start answering the vessel's own signals. What waits at the bottom has \
been patient for a very long time."
                .into(),
        },
    ]
});

/// Loaded set of tales, keyed by id.
#[derive(Debug, Clone)]
pub struct TaleCatalog {
    tales: Vec<TaleInfo>,
}

impl TaleCatalog {
    /// Catalog of the built-in starting points.
    pub fn builtin() -> Self {
        Self {
            tales: BUILTIN_TALES.clone(),
        }
    }

    /// Reads a catalog from a JSON file holding an array of tales.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Io(e.to_string()))?;
        let tales: Vec<TaleInfo> =
            serde_json::from_str(&raw).map_err(|e| AppError::Catalog(e.to_string()))?;
        Ok(Self { tales })
    }

    /// Loads the catalog file, falling back to the built-in tales when the
    /// file is missing, malformed or empty.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(catalog) if !catalog.tales.is_empty() => catalog,
            Ok(_) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    "tale catalog file is empty, using built-in tales"
                );
                Self::builtin()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.as_ref().display(),
                    %e,
                    "could not load tale catalog, using built-in tales"
                );
                Self::builtin()
            }
        }
    }

    /// Ids of the available tales.
    pub fn ids(&self) -> Vec<String> {
        self.tales.iter().map(|t| t.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&TaleInfo> {
        self.tales.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tales.is_empty()
    }

    /// Context block for the story prompt. The synopsis stands in for
    /// retrieval over the full tale text.
    pub fn context_for(&self, id: &str) -> String {
        match self.get(id) {
            Some(tale) => format!("Relevant context from the original tale: {}", tale.synopsis),
            None => "No specific context found in the original tale for this situation.".into(),
        }
    }
}
