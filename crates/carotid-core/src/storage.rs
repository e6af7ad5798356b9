//! Almacenamiento durable de mallas.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::errors::PipelineError;

/// Contrato de almacenamiento. Las ubicaciones son opacas para el pipeline.
#[async_trait]
pub trait MeshStorage: Send + Sync {
    /// Guarda `bytes` bajo `name` y devuelve la ubicación resultante.
    async fn save(&self, bytes: &[u8], name: &str) -> Result<String, PipelineError>;
    /// Copia el contenido de `location` a una ruta local (copia y verificación).
    async fn copy(&self, location: &str, new_location: &Path) -> Result<(), PipelineError>;
    async fn read(&self, location: &str) -> Result<Vec<u8>, PipelineError>;
    async fn exists(&self, location: &str) -> bool;
}

/// Almacenamiento en un directorio local.
#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MeshStorage for LocalDiskStorage {
    async fn save(&self, bytes: &[u8], name: &str) -> Result<String, PipelineError> {
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name == "." || name == ".." {
            return Err(PipelineError::Validation(format!("nombre de almacenamiento inválido: {name:?}")));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!("guardados {} bytes en {}", bytes.len(), path.display());
        Ok(path.to_string_lossy().into_owned())
    }

    async fn copy(&self, location: &str, new_location: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = new_location.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let copied = tokio::fs::copy(location, new_location).await?;
        let expected = tokio::fs::metadata(location).await?.len();
        let actual = tokio::fs::metadata(new_location).await?.len();
        if copied != expected || actual != expected {
            return Err(PipelineError::Storage(format!("copia incompleta de {location} a {}: {actual} de {expected} bytes",
                                                      new_location.display())));
        }
        Ok(())
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>, PipelineError> {
        Ok(tokio::fs::read(location).await?)
    }

    async fn exists(&self, location: &str) -> bool {
        tokio::fs::metadata(location).await.map(|m| m.is_file()).unwrap_or(false)
    }
}
