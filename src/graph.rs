//! Neo4j access for edge creation.
//!
//! `EdgeStore` is the seam the writer talks to. `GraphClient` is the live
//! bolt implementation; `DryRunStore` plans writes without a database.
use async_trait::async_trait;
use log::{debug, info};
use neo4rs::{ConfigBuilder, Graph, Query};

/// Which kind of BloodHound node a group is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Computer,
}

impl EntityKind {
    pub fn node_label(self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Computer => "Computer",
        }
    }

    pub fn relationship(self) -> &'static str {
        match self {
            EntityKind::User => "SamePassword",
            EntityKind::Computer => "SameLocalAdmin",
        }
    }

    /// `name@domain` for users, `name.domain` for computers.
    pub fn qualify(self, name: &str, domain: &str) -> String {
        match self {
            EntityKind::User => format!("{}@{}", name, domain),
            EntityKind::Computer => format!("{}.{}", name, domain),
        }
    }

    /// Cypher creating the relationship in both directions between two nodes
    /// matched by uppercased name. Returns one row per created pair.
    pub fn pair_query(self) -> String {
        format!(
            "MATCH (a:{label}), (b:{label}) \
             WHERE a.name = toUpper($source) AND b.name = toUpper($target) \
             CREATE (a)-[r:{rel}]->(b), (b)-[k:{rel}]->(a) \
             RETURN r",
            label = self.node_label(),
            rel = self.relationship()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("invalid Neo4j configuration: {0}")]
    Config(String),
    #[error("cannot connect to {uri}: {reason}")]
    Connect { uri: String, reason: String },
    #[error("query failed: {0}")]
    Query(String),
}

/// Connection settings for the target database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl GraphConfig {
    pub fn uri(&self) -> String {
        format!("bolt://{}:{}", self.host, self.port)
    }
}

#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Create `source -> target` and `target -> source` edges between two
    /// nodes of `kind`, returning the number of rows the write reported.
    async fn create_pair(&self, kind: EntityKind, source: &str, target: &str)
    -> Result<usize, GraphError>;
}

pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Open the connection and ping it, so an unreachable host fails here
    /// rather than on the first write.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let uri = config.uri();
        let neo4j_config = ConfigBuilder::default()
            .uri(uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(1)
            .build()
            .map_err(|e| GraphError::Config(e.to_string()))?;
        let connect_err = |e: neo4rs::Error| GraphError::Connect {
            uri: uri.clone(),
            reason: e.to_string(),
        };
        let graph = Graph::connect(neo4j_config).await.map_err(connect_err)?;
        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(connect_err)?;
        info!("connected to {}", uri);
        Ok(Self { graph })
    }
}

#[async_trait]
impl EdgeStore for GraphClient {
    async fn create_pair(
        &self,
        kind: EntityKind,
        source: &str,
        target: &str,
    ) -> Result<usize, GraphError> {
        let query = Query::new(kind.pair_query())
            .param("source", source)
            .param("target", target);
        let mut rows = self
            .graph
            .execute(query)
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;
        let mut count = 0;
        while rows
            .next()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?
            .is_some()
        {
            count += 1;
        }
        debug!("{} {} -> {}: {} rows", kind.relationship(), source, target, count);
        Ok(count)
    }
}

/// Logs each pair instead of writing it and reports one row per pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunStore;

#[async_trait]
impl EdgeStore for DryRunStore {
    async fn create_pair(
        &self,
        kind: EntityKind,
        source: &str,
        target: &str,
    ) -> Result<usize, GraphError> {
        info!(
            "[dry-run] {} <-> {} ({})",
            source.to_uppercase(),
            target.to_uppercase(),
            kind.relationship()
        );
        Ok(1)
    }
}
