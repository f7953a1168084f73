//! Escrita atômica de arquivos com segredos

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::CredentialResult;

/// Grava `contents` em `path` via arquivo temporário + rename no mesmo diretório.
///
/// O temporário é criado pelo `tempfile` com permissão 0600, então o arquivo
/// final nunca fica legível por outros usuários, nem durante a escrita.
pub fn write_private(path: &Path, contents: &[u8]) -> CredentialResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    restrict_to_owner(path)?;
    Ok(())
}

/// Remove um arquivo; ausente conta como removido
pub fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove um diretório recursivamente; ausente conta como removido
pub fn remove_dir_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
