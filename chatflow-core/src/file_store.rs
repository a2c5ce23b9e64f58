use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::{ConversationState, Context};
use crate::store::StateStore;
use crate::ChatflowError;

/// On-disk shape of one chat's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub state_id: String,
    pub context: Context,
}

/// One JSON file per chat under `state_dir`.
///
/// Files that cannot be read or do not hold a `{"state_id", "context"}` object
/// are reported as "no record".
#[derive(Clone, Debug)]
pub struct FileStateStore {
    state_dir: PathBuf,
}

impl FileStateStore {
    /// Creates `state_dir` if it does not exist yet.
    pub fn new<P: AsRef<Path>>(state_dir: P) -> Result<Self, ChatflowError> {
        let state_dir = state_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&state_dir).map_err(|err| {
            ChatflowError::store(format!(
                "cannot create state directory {}: {err}",
                state_dir.display()
            ))
        })?;
        Ok(Self { state_dir })
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// File holding `chat_id`'s record. The chat id is percent-encoded, so
    /// distinct ids never share a file and none can leave `state_dir`.
    pub fn chat_path(&self, chat_id: &str) -> PathBuf {
        let filename = format!("{}.json", urlencoding::encode(chat_id));
        self.state_dir.join(filename)
    }
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn get_state(&self, chat_id: &str) -> Result<ConversationState, ChatflowError> {
        let path = self.chat_path(chat_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ConversationState::empty()),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable state file");
                return Ok(ConversationState::empty());
            }
        };
        match serde_json::from_slice::<StateRecord>(&bytes) {
            Ok(record) => Ok(ConversationState::new(record.state_id, record.context)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed state file");
                Ok(ConversationState::empty())
            }
        }
    }

    async fn set_state(
        &self,
        chat_id: &str,
        state_id: &str,
        context: &Context,
    ) -> Result<(), ChatflowError> {
        let path = self.chat_path(chat_id);
        let record = StateRecord {
            state_id: state_id.to_string(),
            context: context.clone(),
        };
        let payload = serde_json::to_vec(&record)?;

        // Write beside the target and rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|err| ChatflowError::store(err.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| ChatflowError::store(err.to_string()))?;
        Ok(())
    }

    async fn delete_state(&self, chat_id: &str) -> Result<(), ChatflowError> {
        match tokio::fs::remove_file(self.chat_path(chat_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ChatflowError::store(err.to_string())),
        }
    }
}
