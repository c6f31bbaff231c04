//! One-shot provisioning of the database resources the service relies on.
//!
//! The sequence is strictly ordered: database, database-scoped credential,
//! collections, indexes, then sample records. Every resource is created only
//! when an existence check says it is missing, so repeated runs converge on a
//! single database, collection and index. Any error other than "already
//! exists" (or "not unique" while seeding) aborts the run.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use notebase_core::{defaults, Document, Error, Ref, Result, SampleInstance};

use crate::client::{query, Gateway};
use crate::fql::{self, Expr, PageOptions};
use crate::notes::Page;

/// Largest key page fetched when looking for stale credentials.
const KEY_PAGE_SIZE: u32 = 1_000;

/// What to do about credentials minted by earlier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Mint a fresh key, then revoke every older key this tool issued for the database.
    #[default]
    Rotate,
    /// Mint a fresh key and leave older ones alone.
    Mint,
}

impl FromStr for KeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rotate" => Ok(Self::Rotate),
            "mint" => Ok(Self::Mint),
            other => Err(format!("unknown key policy '{}' (expected rotate or mint)", other)),
        }
    }
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotate => write!(f, "rotate"),
            Self::Mint => write!(f, "mint"),
        }
    }
}

/// Kinds of schema resource the setup tool manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Database,
    Collection,
    Index,
}

impl ResourceKind {
    fn reference(self, name: &str) -> Expr {
        match self {
            Self::Database => fql::database(name),
            Self::Collection => fql::collection(name),
            Self::Index => fql::index(name),
        }
    }

    fn known_ref(self, name: &str) -> Ref {
        match self {
            Self::Database => Ref::database(name),
            Self::Collection => Ref::collection(name),
            Self::Index => Ref::index(name),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Collection => write!(f, "collection"),
            Self::Index => write!(f, "index"),
        }
    }
}

/// Result of a create-if-not-exists step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(Ref),
    Existed(Ref),
}

impl Outcome {
    pub fn created(&self) -> bool {
        matches!(self, Outcome::Created(_))
    }

    pub fn reference(&self) -> &Ref {
        match self {
            Outcome::Created(r) | Outcome::Existed(r) => r,
        }
    }
}

/// How the database-scoped credential was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A secret supplied by the operator was used as is.
    Reused,
    /// A new key was minted; older keys listed in `revoked` were deleted.
    Minted { key: Ref, revoked: Vec<Ref> },
}

/// Settings for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub database: String,
    pub sample_collection: String,
    pub sample_index: String,
    pub notes_collection: String,
    pub notes_index: String,
    pub key_policy: KeyPolicy,
    /// Existing database-scoped secret; when set no key is minted.
    pub reuse_secret: Option<String>,
    pub seed_samples: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            database: defaults::SETUP_DATABASE.to_string(),
            sample_collection: defaults::SAMPLE_COLLECTION.to_string(),
            sample_index: defaults::SAMPLE_INDEX.to_string(),
            notes_collection: defaults::NOTES_COLLECTION.to_string(),
            notes_index: defaults::NOTES_INDEX.to_string(),
            key_policy: KeyPolicy::default(),
            reuse_secret: None,
            seed_samples: true,
        }
    }
}

/// Result of seeding the sample collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub inserted: Vec<i64>,
    /// Ids the unique index already held.
    pub skipped: Vec<i64>,
    /// Each inserted sample as read back through the reference the create returned.
    pub read_by_ref: Vec<SampleInstance>,
}

/// Summary of a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub database: Outcome,
    pub key: KeyOutcome,
    /// Secret of a freshly minted key; `None` when an existing secret was reused.
    pub minted_secret: Option<String>,
    pub collections: Vec<(String, Outcome)>,
    pub indexes: Vec<(String, Outcome)>,
    pub inserted: Vec<i64>,
    pub skipped: Vec<i64>,
    pub read_by_ref: Vec<SampleInstance>,
    pub read_back: Vec<SampleInstance>,
}

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(rename = "ref")]
    reference: Ref,
}

/// A key document as returned by the database. `secret` is only present in
/// the response to the query that created the key.
#[derive(Debug, Deserialize)]
struct KeyDocument {
    #[serde(rename = "ref")]
    reference: Ref,
    #[serde(default)]
    database: Option<Ref>,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default)]
    data: Option<KeyData>,
}

#[derive(Debug, Deserialize)]
struct KeyData {
    #[serde(default)]
    issued_by: Option<String>,
}

impl KeyDocument {
    fn issued_for(&self, database: &str) -> bool {
        let ours = self
            .data
            .as_ref()
            .and_then(|d| d.issued_by.as_deref())
            .is_some_and(|issuer| issuer == defaults::KEY_ISSUER);
        let same_db = self.database.as_ref().is_some_and(|db| db.id == database);
        ours && same_db
    }
}

async fn ensure<G: Gateway + ?Sized>(
    gateway: &G,
    kind: ResourceKind,
    name: &str,
    create: Expr,
) -> Result<Outcome> {
    let exists: bool = query(gateway, &fql::exists(kind.reference(name))).await?;
    if exists {
        info!(kind = %kind, resource = name, "exists");
        return Ok(Outcome::Existed(kind.known_ref(name)));
    }

    match query::<_, SchemaDocument>(gateway, &create).await {
        Ok(doc) => {
            info!(kind = %kind, resource = name, reference = %doc.reference, "created");
            Ok(Outcome::Created(doc.reference))
        }
        Err(e) if e.is_already_exists() => {
            info!(kind = %kind, resource = name, "exists (created concurrently)");
            Ok(Outcome::Existed(kind.known_ref(name)))
        }
        Err(e) => Err(e),
    }
}

/// Create database `name` unless it exists.
#[instrument(skip(admin), fields(subsystem = "setup", component = "provision", op = "ensure_database"))]
pub async fn ensure_database<G: Gateway + ?Sized>(admin: &G, name: &str) -> Result<Outcome> {
    let create = fql::create_database(fql::obj([("name", Expr::from(name))]));
    ensure(admin, ResourceKind::Database, name, create).await
}

/// Create collection `name` unless it exists.
#[instrument(skip(session), fields(subsystem = "setup", component = "provision", op = "ensure_collection"))]
pub async fn ensure_collection<G: Gateway + ?Sized>(session: &G, name: &str) -> Result<Outcome> {
    let create = fql::create_collection(fql::obj([("name", Expr::from(name))]));
    ensure(session, ResourceKind::Collection, name, create).await
}

/// Create index `name` over `source` unless it exists.
///
/// `term` names a field under `data` to index on; `None` builds an index
/// that matches every document of the collection.
#[instrument(skip(session), fields(subsystem = "setup", component = "provision", op = "ensure_index"))]
pub async fn ensure_index<G: Gateway + ?Sized>(
    session: &G,
    name: &str,
    source: &str,
    term: Option<&str>,
    unique: bool,
) -> Result<Outcome> {
    let mut params = vec![
        ("name", Expr::from(name)),
        ("source", fql::collection(source)),
    ];
    if let Some(field) = term {
        let path = fql::arr([Expr::from("data"), Expr::from(field)]);
        params.push(("terms", fql::arr([fql::obj([("field", path)])])));
    }
    if unique {
        params.push(("unique", Expr::from(true)));
    }
    ensure(session, ResourceKind::Index, name, fql::create_index(fql::obj(params))).await
}

/// Mint a `server` key scoped to `database` and return it with its secret.
async fn mint_key<G: Gateway + ?Sized>(admin: &G, database: &str) -> Result<(Ref, String)> {
    let params = fql::obj([
        ("database", fql::database(database)),
        ("role", Expr::from(defaults::KEY_ROLE)),
        ("data", fql::obj([("issued_by", Expr::from(defaults::KEY_ISSUER))])),
    ]);
    let key: KeyDocument = query(admin, &fql::create_key(params)).await?;
    let secret = key
        .secret
        .ok_or_else(|| Error::Query("key response carried no secret".to_string()))?;
    info!(database, key = %key.reference, "minted database key");
    Ok((key.reference, secret))
}

/// Delete every key this tool issued for `database` except `keep`.
async fn revoke_stale_keys<G: Gateway + ?Sized>(
    admin: &G,
    database: &str,
    keep: &Ref,
) -> Result<Vec<Ref>> {
    let expr = fql::map(
        fql::paginate(fql::keys(), PageOptions::size(KEY_PAGE_SIZE)),
        fql::lambda("K", fql::get(fql::var("K"))),
    );
    let page: Page<KeyDocument> = query(admin, &expr).await?;

    let mut revoked = Vec::new();
    for key in page.data {
        if key.reference == *keep || !key.issued_for(database) {
            continue;
        }
        match query::<_, serde_json::Value>(admin, &fql::delete(Expr::from(&key.reference))).await {
            Ok(_) => {
                info!(database, key = %key.reference, "revoked stale key");
                revoked.push(key.reference);
            }
            // Already gone: another run revoked it first.
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(revoked)
}

/// Obtain a gateway scoped to `config.database`.
///
/// Returns the scoped gateway, how the credential was obtained, and the new
/// secret when one was minted.
#[instrument(skip_all, fields(subsystem = "setup", component = "provision", op = "ensure_session"))]
pub async fn ensure_session<G: Gateway>(
    admin: &G,
    config: &ProvisionConfig,
) -> Result<(G, KeyOutcome, Option<String>)> {
    if let Some(secret) = &config.reuse_secret {
        info!(database = %config.database, "reusing supplied database secret");
        return Ok((admin.scoped(secret), KeyOutcome::Reused, None));
    }

    let (key, secret) = mint_key(admin, &config.database).await?;
    let revoked = match config.key_policy {
        KeyPolicy::Rotate => revoke_stale_keys(admin, &config.database, &key).await?,
        KeyPolicy::Mint => Vec::new(),
    };

    Ok((
        admin.scoped(&secret),
        KeyOutcome::Minted { key, revoked },
        Some(secret),
    ))
}

/// Insert each sample, skipping those the unique index already holds.
///
/// Every inserted document is fetched again by its reference before moving
/// on to the next sample.
#[instrument(skip(session, samples), fields(subsystem = "setup", component = "provision", op = "insert_samples"))]
pub async fn insert_samples<G: Gateway + ?Sized>(
    session: &G,
    collection: &str,
    samples: &[SampleInstance],
) -> Result<SeedOutcome> {
    let mut seeded = SeedOutcome::default();

    for sample in samples {
        let params = fql::obj([("data", Expr::from_data(sample)?)]);
        let expr = fql::create(fql::collection(collection), params);
        match query::<_, Document<SampleInstance>>(session, &expr).await {
            Ok(doc) => {
                info!(id = sample.id, reference = %doc.reference, "inserted sample");
                let stored: Document<SampleInstance> =
                    query(session, &fql::get(Expr::from(&doc.reference))).await?;
                info!(id = stored.data.id, reference = %stored.reference, name = %stored.data.name, "read sample by reference");
                seeded.inserted.push(sample.id);
                seeded.read_by_ref.push(stored.data);
            }
            Err(e) if e.is_not_unique() => {
                warn!(id = sample.id, error = %e, "sample already present, skipping");
                seeded.skipped.push(sample.id);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(seeded)
}

/// Read each sample back by its `id` through the unique index.
#[instrument(skip(session, ids), fields(subsystem = "setup", component = "provision", op = "read_samples"))]
pub async fn read_samples<G: Gateway + ?Sized>(
    session: &G,
    index: &str,
    ids: &[i64],
) -> Result<Vec<SampleInstance>> {
    let mut found = Vec::with_capacity(ids.len());
    for &id in ids {
        let expr = fql::get(fql::match_terms(fql::index(index), id));
        let doc: Document<SampleInstance> = query(session, &expr).await?;
        info!(id, reference = %doc.reference, name = %doc.data.name, "read sample");
        found.push(doc.data);
    }
    Ok(found)
}

/// Run the whole provisioning sequence.
pub async fn run<G: Gateway>(admin: &G, config: &ProvisionConfig) -> Result<ProvisionReport> {
    info!(
        subsystem = "setup",
        database = %config.database,
        key_policy = %config.key_policy,
        "Provisioning started"
    );

    let database = ensure_database(admin, &config.database).await?;
    let (session, key, minted_secret) = ensure_session(admin, config).await?;

    let mut collections = Vec::new();
    for name in [&config.sample_collection, &config.notes_collection] {
        let outcome = ensure_collection(&session, name).await?;
        collections.push((name.clone(), outcome));
    }

    let mut indexes = Vec::new();
    let sample_index = ensure_index(
        &session,
        &config.sample_index,
        &config.sample_collection,
        Some("id"),
        true,
    )
    .await?;
    indexes.push((config.sample_index.clone(), sample_index));
    let notes_index = ensure_index(
        &session,
        &config.notes_index,
        &config.notes_collection,
        None,
        false,
    )
    .await?;
    indexes.push((config.notes_index.clone(), notes_index));

    let (seeded, read_back) = if config.seed_samples {
        let samples = SampleInstance::seed();
        let seeded = insert_samples(&session, &config.sample_collection, &samples).await?;
        let ids: Vec<i64> = samples.iter().map(|s| s.id).collect();
        let read_back = read_samples(&session, &config.sample_index, &ids).await?;
        (seeded, read_back)
    } else {
        (SeedOutcome::default(), Vec::new())
    };

    info!(
        subsystem = "setup",
        inserted = seeded.inserted.len(),
        skipped = seeded.skipped.len(),
        "Provisioning finished"
    );

    Ok(ProvisionReport {
        database,
        key,
        minted_secret,
        collections,
        indexes,
        inserted: seeded.inserted,
        skipped: seeded.skipped,
        read_by_ref: seeded.read_by_ref,
        read_back,
    })
}
