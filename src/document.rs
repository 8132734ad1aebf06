//! Editor document storage.
//!
//! Handlers map a request's URI to a module directory, a filename and the
//! current buffer text through a [`DocumentStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use ropey::Rope;
use tower_lsp::lsp_types::{Position, Url};

use crate::context::{LanguageId, RequestError};

#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub dir: PathBuf,
    pub filename: String,
    pub language_id: LanguageId,
    pub text: Rope,
    pub version: i32,
}

impl Document {
    pub fn new(
        uri: Url,
        language_id: LanguageId,
        text: &str,
        version: i32,
    ) -> Result<Document, RequestError> {
        let path = uri
            .to_file_path()
            .map_err(|_| RequestError::UnknownDocument(uri.clone()))?;
        let (Some(dir), Some(filename)) = (path.parent(), path.file_name()) else {
            return Err(RequestError::UnknownDocument(uri));
        };

        Ok(Document {
            dir: dir.to_path_buf(),
            filename: filename.to_string_lossy().into_owned(),
            uri,
            language_id,
            text: Rope::from_str(text),
            version,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Fails with `InvalidPosition` when `position` lies beyond the text.
    pub fn check_position(&self, position: Position) -> Result<(), RequestError> {
        let line = position.line as usize;
        if line >= self.text.len_lines() {
            return Err(RequestError::invalid_position(&self.uri, position));
        }
        let content = self.text.line(line);
        let len = content
            .chars()
            .take_while(|c| *c != '\n' && *c != '\r')
            .count();
        if position.character as usize > len {
            return Err(RequestError::invalid_position(&self.uri, position));
        }
        Ok(())
    }
}

pub trait DocumentStore: Send + Sync {
    fn get(&self, uri: &Url) -> Result<Arc<Document>, RequestError>;
    /// Whether any open document lives directly in `dir`.
    fn has_open_documents(&self, dir: &Path) -> bool;
}

#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    docs: RwLock<HashMap<Url, Arc<Document>>>,
}

impl InMemoryDocuments {
    pub fn new() -> InMemoryDocuments {
        InMemoryDocuments::default()
    }

    pub fn open(&self, doc: Document) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc.uri.clone(), Arc::new(doc));
    }

    /// Replaces the text of an open document.
    pub fn change(&self, uri: &Url, text: &str, version: i32) -> Result<(), RequestError> {
        let mut docs = self.docs.write().unwrap_or_else(PoisonError::into_inner);
        let doc = docs
            .get_mut(uri)
            .ok_or_else(|| RequestError::UnknownDocument(uri.clone()))?;
        let mut updated = Document::clone(doc);
        updated.text = Rope::from_str(text);
        updated.version = version;
        *doc = Arc::new(updated);
        Ok(())
    }

    pub fn close(&self, uri: &Url) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
    }
}

impl DocumentStore for InMemoryDocuments {
    fn get(&self, uri: &Url) -> Result<Arc<Document>, RequestError> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
            .ok_or_else(|| RequestError::UnknownDocument(uri.clone()))
    }

    fn has_open_documents(&self, dir: &Path) -> bool {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|doc| doc.dir == dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Url {
        Url::from_file_path(path).unwrap()
    }

    #[test]
    fn test_document_splits_dir_and_filename() {
        let doc = Document::new(uri("/ws/app/main.tf"), LanguageId::Module, "", 1).unwrap();

        assert_eq!(doc.dir, PathBuf::from("/ws/app"));
        assert_eq!(doc.filename, "main.tf");
        assert_eq!(doc.path(), PathBuf::from("/ws/app/main.tf"));
    }

    #[test]
    fn test_non_file_uri_is_unknown() {
        let url = Url::parse("untitled:Untitled-1").unwrap();
        assert!(matches!(
            Document::new(url, LanguageId::Module, "", 1),
            Err(RequestError::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_check_position() {
        let doc = Document::new(
            uri("/ws/main.tf"),
            LanguageId::Module,
            "variable \"a\" {}\nlocals {}\n",
            1,
        )
        .unwrap();

        assert!(doc.check_position(Position::new(0, 15)).is_ok());
        assert!(doc.check_position(Position::new(1, 9)).is_ok());
        assert!(doc.check_position(Position::new(1, 10)).is_err());
        assert!(doc.check_position(Position::new(3, 0)).is_err());
    }

    #[test]
    fn test_store_lifecycle() {
        let docs = InMemoryDocuments::new();
        let u = uri("/ws/main.tf");
        docs.open(Document::new(u.clone(), LanguageId::Module, "a", 1).unwrap());

        docs.change(&u, "b\nc", 2).unwrap();
        let doc = docs.get(&u).unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.text.len_lines(), 2);
        assert!(docs.has_open_documents(Path::new("/ws")));

        docs.close(&u);
        assert!(matches!(docs.get(&u), Err(RequestError::UnknownDocument(_))));
        assert!(docs.change(&u, "", 3).is_err());
    }
}
