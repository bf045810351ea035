//! On-disk output for retrieved chunks

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use spectate_client::{Chunk, ChunkKind, GameReference};
use spectate_core::SessionSummary;

/// Writes each chunk of one game to `{root}/{platform}-{game_id}/`
pub struct ChunkWriter {
    dir: PathBuf,
}

impl ChunkWriter {
    pub async fn create(root: &Path, game: &GameReference) -> Result<Self> {
        let dir = root.join(format!("{}-{}", game.platform, game.game_id));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: ChunkKind, id: i64) -> PathBuf {
        self.dir.join(format!("{kind}-{id:05}.bin"))
    }

    pub async fn write(&self, chunk: &Chunk) -> Result<PathBuf> {
        let path = self.path_for(chunk.kind, chunk.id);
        tokio::fs::write(&path, &chunk.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub async fn write_summary(&self, summary: &SessionSummary) -> Result<PathBuf> {
        let path = self.dir.join("summary.json");
        let body = serde_json::to_vec_pretty(summary)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
