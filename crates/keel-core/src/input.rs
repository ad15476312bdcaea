//! Input shapes accepted by every handler operation
//!
//! A resource can be handed to a handler as:
//! - a path to a YAML/JSON file,
//! - raw YAML/JSON bytes,
//! - a typed object of the handler's kind,
//! - a polymorphic object (any [`AnyObject`], including [`DynamicObject`]),
//! - a loosely-typed [`Document`].
//!
//! [`Input::resolve`] turns any of these into the typed resource.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use kube::api::DynamicObject;
use serde_json::Value;

use crate::codec::{self, Document};
use crate::error::{CoreError, Result};
use crate::kind::{AnyObject, ResourceKind};

/// A resource in one of the accepted input shapes
pub enum Input<K> {
    /// Path to a YAML or JSON file
    Path(PathBuf),
    /// Encoded YAML or JSON
    Bytes(Vec<u8>),
    /// Already-typed object of the bound kind
    Typed(K),
    /// Object whose concrete type is only known at runtime
    Object(Box<dyn AnyObject>),
    /// Loosely-typed nested document
    Document(Document),
}

impl<K: ResourceKind> Input<K> {
    pub fn typed(resource: K) -> Self {
        Self::Typed(resource)
    }

    pub fn object(object: impl AnyObject + 'static) -> Self {
        Self::Object(Box::new(object))
    }

    /// Map an arbitrary value onto an input shape
    ///
    /// Strings and paths are file paths, byte vectors are encoded documents.
    /// Anything without a mapping is rejected with
    /// [`CoreError::UnsupportedInputType`].
    pub fn from_any(value: Box<dyn Any + Send + Sync>) -> Result<Self> {
        let value = match value.downcast::<K>() {
            Ok(typed) => return Ok(Self::Typed(*typed)),
            Err(value) => value,
        };
        let value = match value.downcast::<DynamicObject>() {
            Ok(dynamic) => return Ok(Self::Object(dynamic)),
            Err(value) => value,
        };
        let value = match value.downcast::<Box<dyn AnyObject>>() {
            Ok(object) => return Ok(Self::Object(*object)),
            Err(value) => value,
        };
        let value = match value.downcast::<PathBuf>() {
            Ok(path) => return Ok(Self::Path(*path)),
            Err(value) => value,
        };
        let value = match value.downcast::<String>() {
            Ok(path) => return Ok(Self::Path(PathBuf::from(*path))),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static str>() {
            Ok(path) => return Ok(Self::Path(PathBuf::from(*path))),
            Err(value) => value,
        };
        let value = match value.downcast::<Vec<u8>>() {
            Ok(bytes) => return Ok(Self::Bytes(*bytes)),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static [u8]>() {
            Ok(bytes) => return Ok(Self::Bytes(bytes.to_vec())),
            Err(value) => value,
        };
        let value = match value.downcast::<Document>() {
            Ok(doc) => return Ok(Self::Document(*doc)),
            Err(value) => value,
        };
        match value.downcast::<Value>() {
            Ok(value) => match *value {
                Value::Object(doc) => Ok(Self::Document(doc)),
                _ => Err(unsupported::<K>()),
            },
            Err(_) => Err(unsupported::<K>()),
        }
    }

    /// Short label of the input shape, for logs
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Path(_) => "file",
            Self::Bytes(_) => "bytes",
            Self::Typed(_) => "typed object",
            Self::Object(_) => "object",
            Self::Document(_) => "document",
        }
    }

    /// Whether this input carries a full object rather than encoded text
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Typed(_) | Self::Object(_) | Self::Document(_))
    }

    /// Resolve the input into the typed resource
    ///
    /// Reads the file for [`Input::Path`] synchronously. Handlers that must
    /// observe cancellation read the file themselves and pass bytes instead.
    pub fn resolve(self) -> Result<K> {
        match self {
            Self::Path(path) => {
                let bytes = read_file(&path)?;
                codec::decode(&bytes)
            }
            Self::Bytes(bytes) => codec::decode(&bytes),
            Self::Typed(resource) => Ok(resource),
            Self::Object(object) => resolve_object(object),
            Self::Document(doc) => codec::from_document(doc),
        }
    }
}

fn resolve_object<K: ResourceKind>(object: Box<dyn AnyObject>) -> Result<K> {
    let declared = object.type_meta();
    let dynamic = object.is_dynamic();

    let any = object.into_any();
    let any = match any.downcast::<K>() {
        Ok(typed) => return Ok(*typed),
        Err(any) => any,
    };

    if dynamic {
        if let Ok(obj) = any.downcast::<DynamicObject>() {
            let value = serde_json::to_value(&*obj)
                .map_err(|e| CoreError::conversion(K::INFO.kind, e))?;
            return codec::from_value(value);
        }
    }

    Err(CoreError::TypeMismatch {
        expected: K::INFO.kind.to_string(),
        found: if declared.kind.is_empty() {
            "an untyped object".to_string()
        } else {
            declared.kind
        },
    })
}

fn unsupported<K: ResourceKind>() -> CoreError {
    CoreError::UnsupportedInputType {
        kind: K::INFO.kind.to_string(),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| CoreError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl<K> From<PathBuf> for Input<K> {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl<K> From<&Path> for Input<K> {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl<K> From<Vec<u8>> for Input<K> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<K> From<&[u8]> for Input<K> {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<K> From<Document> for Input<K> {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

impl<K> From<DynamicObject> for Input<K> {
    fn from(obj: DynamicObject) -> Self {
        Self::Object(Box::new(obj))
    }
}

impl<K> From<Box<dyn AnyObject>> for Input<K> {
    fn from(obj: Box<dyn AnyObject>) -> Self {
        Self::Object(obj)
    }
}

impl<K: fmt::Debug> fmt::Debug for Input<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Typed(resource) => f.debug_tuple("Typed").field(resource).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.type_meta()).finish(),
            Self::Document(doc) => f.debug_tuple("Document").field(doc).finish(),
        }
    }
}
