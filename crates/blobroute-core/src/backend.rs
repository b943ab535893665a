//! Operation contract a storage endpoint must expose.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BackendResult;
use crate::types::{
    ByteStream, DeleteMultiOptions, GetOptions, HeadOptions, ListOptions, ListPage, ObjectContent,
    ObjectMeta, PutOptions, Receipt, SignatureOptions,
};

/// One storage endpoint as the router sees it.
///
/// Implementations perform the actual wire protocol: request signing,
/// response parsing, body streaming. The router reaches them only through
/// this surface and classifies their failures by the status carried on the
/// [`BackendError`](crate::BackendError).
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetch object metadata. Fails with status 404 when the object is
    /// absent.
    async fn head(&self, key: &str, opts: &HeadOptions) -> BackendResult<ObjectMeta>;

    /// Fetch an object fully buffered.
    async fn get(&self, key: &str, opts: &GetOptions) -> BackendResult<ObjectContent>;

    /// Fetch an object as a stream of chunks.
    async fn get_stream(&self, key: &str, opts: &GetOptions) -> BackendResult<ByteStream>;

    /// List one page of objects.
    async fn list(&self, opts: &ListOptions) -> BackendResult<ListPage>;

    /// Store a buffered object.
    async fn put(&self, key: &str, body: Bytes, opts: &PutOptions) -> BackendResult<Receipt>;

    /// Store an object from a stream of chunks.
    async fn put_stream(
        &self,
        key: &str,
        body: ByteStream,
        opts: &PutOptions,
    ) -> BackendResult<Receipt>;

    /// Delete one object.
    async fn delete(&self, key: &str) -> BackendResult<Receipt>;

    /// Delete several objects in one call.
    async fn delete_multi(
        &self,
        keys: &[String],
        opts: &DeleteMultiOptions,
    ) -> BackendResult<Receipt>;

    /// Copy `src` to `dest` within this endpoint.
    async fn copy(&self, dest: &str, src: &str, opts: &PutOptions) -> BackendResult<Receipt>;

    /// Replace the user metadata of an existing object.
    async fn put_meta(&self, key: &str, meta: &HashMap<String, String>) -> BackendResult<Receipt>;

    /// Produce a pre-signed URL for `key`. Local computation, no I/O.
    fn signature_url(&self, key: &str, opts: &SignatureOptions) -> BackendResult<String>;

    /// Canonical URL of `key` on this endpoint, used in diagnostics.
    fn object_url(&self, key: &str) -> String;
}
