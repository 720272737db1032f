pub mod ollama;
pub mod openai;

use anyhow::bail;
use anyhow::Result;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;

pub struct BackendManager {}

impl BackendManager {
    pub fn get(name: BackendName) -> Result<BackendBox> {
        return match name {
            BackendName::Ollama => Ok(Box::<ollama::Ollama>::default()),
            BackendName::OpenAI => Ok(Box::<openai::OpenAI>::default()),
        };
    }

    /// Backend named by the `backend` configuration key.
    pub fn from_config() -> Result<BackendBox> {
        let name = Config::get(ConfigKey::Backend);
        if let Some(backend_name) = BackendName::parse(&name) {
            return BackendManager::get(backend_name);
        }

        bail!(format!("No backend implemented for {name}"));
    }
}
