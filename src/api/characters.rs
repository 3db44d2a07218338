//! Character endpoints

use crate::api::characters::schemas::{CharacterList, CreateCharacter};
use crate::error::PlatformError;
use crate::infrastructure::entities::Character;
use crate::infrastructure::traits::CharacterRepository;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_characters))
        .route("/:id", get(get_character))
}

async fn list_characters(
    Inject(characters): Inject<dyn CharacterRepository>,
) -> Result<Json<CharacterList>, PlatformError> {
    Ok(Json(CharacterList {
        characters: characters.list_characters().await?,
    }))
}

async fn get_character(
    Inject(characters): Inject<dyn CharacterRepository>,
    Path(character_id): Path<String>,
) -> Result<Json<Character>, PlatformError> {
    Ok(Json(characters.get_character(&character_id).await?))
}

pub async fn create_character(
    Inject(characters): Inject<dyn CharacterRepository>,
    Json(request): Json<CreateCharacter>,
) -> Result<(StatusCode, Json<Character>), PlatformError> {
    let traits = request.traits.into_list();
    let character = characters.create_character(&request.topic, &traits).await?;
    Ok((StatusCode::CREATED, Json(character)))
}

pub mod schemas {
    use crate::infrastructure::entities::Character;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Debug)]
    pub struct CharacterList {
        pub characters: Vec<Character>,
    }

    #[derive(Deserialize, Debug)]
    pub struct CreateCharacter {
        pub topic: String,
        pub traits: Traits,
    }

    /// Either a JSON list or a comma-separated string, as sent by the web form.
    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(untagged)]
    pub enum Traits {
        List(Vec<String>),
        Text(String),
    }

    impl Traits {
        pub fn into_list(self) -> Vec<String> {
            let raw = match self {
                Traits::List(list) => list,
                Traits::Text(text) => text.split(',').map(str::to_owned).collect(),
            };
            raw.into_iter()
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect()
        }
    }

}
