//! Named query templates.
//!
//! A fixed catalog of parameterized query shapes for the common access
//! patterns, wrapping the fluent builder where the shape allows and falling
//! back to hand-authored parameterized text for path-comprehension shapes
//! the builder does not model. Either way the safety invariant holds:
//! caller-supplied values travel exclusively as named parameters.
//!
//! Graph-shaped templates return rows carrying `nodes` / `edges` list
//! columns; [`graph_payload_from_rows`] merges and deduplicates them into a
//! normalized [`GraphPayload`] regardless of which template produced them.
//! Aggregate templates normalize through [`scalar_from_rows`].
//!
//! Structural knobs (traversal depth, radius, relationship type) are not
//! values: Cypher cannot parameterize pattern lengths or relationship type
//! markers. Depths are clamped integers; relationship types pass through
//! [`sanitize_rel_type`].

use crate::query::builder::{CypherQuery, QueryBuilder, SortOrder};
use crate::store::models::{Row, RowExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hard ceiling on rendered traversal depth.
pub const MAX_DEPTH: u32 = 10;

/// Normalized node shape shared by every graph template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNode {
    pub id: String,
    pub entity_type: String,
    pub name: String,
}

/// Normalized edge shape shared by every graph template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadEdge {
    pub source: String,
    pub target: String,
    pub rel_type: String,
}

/// Normalized `{nodes, edges}` result of a graph-shaped template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphPayload {
    pub nodes: Vec<PayloadNode>,
    pub edges: Vec<PayloadEdge>,
}

/// Reusable projection of a path into `nodes` / `edges` list columns.
const PATH_PROJECTION: &str = "[n IN nodes(path) | {id: n.id, entity_type: n.entity_type, \
     name: coalesce(n.name, n.id)}] AS nodes, \
     [r IN relationships(path) | {source: startNode(r).id, target: endNode(r).id, \
     rel_type: type(r)}] AS edges";

fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(1, MAX_DEPTH)
}

/// Restrict a relationship type marker to identifier characters.
pub fn sanitize_rel_type(rel_type: &str) -> String {
    rel_type
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

// ============================================================================
// Entity lookup
// ============================================================================

/// Current entity by exact id.
pub fn find_entity_by_id(id: &str) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .where_param("e.id", "=", id)
        .return_item("properties(e) AS props")
        .build()
        .expect("template is structurally valid")
}

/// Current entity by exact `name` property.
pub fn find_entity_by_name(name: &str) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .where_param("e.name", "=", name)
        .return_item("properties(e) AS props")
        .build()
        .expect("template is structurally valid")
}

/// Case-insensitive substring search over entity names.
pub fn search_entities_by_name(fragment: &str, limit: u64) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .where_param("toLower(e.name)", "CONTAINS", fragment.to_lowercase())
        .return_item("properties(e) AS props")
        .order_by("e.name", SortOrder::Asc)
        .limit(limit)
        .build()
        .expect("template is structurally valid")
}

/// Current entities of one type label.
pub fn find_entities_by_type(entity_type: &str, limit: u64) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .where_param("e.entity_type", "=", entity_type)
        .return_item("properties(e) AS props")
        .order_by("e.id", SortOrder::Asc)
        .limit(limit)
        .build()
        .expect("template is structurally valid")
}

/// Current entities whose property `key` equals `value`.
/// The key is indexed dynamically (`e[$key]`) so both sides are parameters.
pub fn entities_by_property(key: &str, value: impl Into<Value>) -> CypherQuery {
    CypherQuery::new(
        "MATCH (e:Entity) WHERE e.valid_to IS NULL AND e[$key] = $value \
         RETURN properties(e) AS props ORDER BY e.id",
    )
    .with_param("key", key)
    .with_param("value", value)
}

/// Current entities modified at or after the given fixed-width timestamp.
pub fn recently_modified(since: &str, limit: u64) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .where_param("e.valid_from", ">=", since)
        .return_item("properties(e) AS props")
        .order_by("e.valid_from", SortOrder::Desc)
        .limit(limit)
        .build()
        .expect("template is structurally valid")
}

/// A deterministic sample of current entities (first `limit` by id).
pub fn sample_entities(limit: u64) -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .return_item("properties(e) AS props")
        .order_by("e.id", SortOrder::Asc)
        .limit(limit)
        .build()
        .expect("template is structurally valid")
}

// ============================================================================
// Traversal (graph-shaped)
// ============================================================================

/// Entities within `depth` hops of a seed, as a `{nodes, edges}` payload.
pub fn neighbors(entity_id: &str, depth: u32, limit: u64) -> CypherQuery {
    let depth = clamp_depth(depth);
    CypherQuery::new(format!(
        "MATCH path = (a:Entity {{id: $id}})-[*1..{depth}]-(b:Entity) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN {PATH_PROJECTION} LIMIT {limit}"
    ))
    .with_param("id", entity_id)
}

/// Shortest path between two entities, bounded by `max_hops`.
pub fn shortest_path(from_id: &str, to_id: &str, max_hops: u32) -> CypherQuery {
    let max_hops = clamp_depth(max_hops);
    CypherQuery::new(format!(
        "MATCH path = shortestPath((a:Entity {{id: $from}})-[*..{max_hops}]-(b:Entity {{id: $to}})) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN {PATH_PROJECTION}"
    ))
    .with_param("from", from_id)
    .with_param("to", to_id)
}

/// Subgraph within `radius` hops of a center, capped at `max_nodes` paths.
pub fn subgraph_by_radius(center_id: &str, radius: u32, max_nodes: u64) -> CypherQuery {
    let radius = clamp_depth(radius);
    CypherQuery::new(format!(
        "MATCH path = (c:Entity {{id: $id}})-[*0..{radius}]-(n:Entity) \
         WHERE c.valid_to IS NULL AND n.valid_to IS NULL \
         RETURN {PATH_PROJECTION} LIMIT {max_nodes}"
    ))
    .with_param("id", center_id)
}

/// Bounded-depth traversal following a single relationship type.
pub fn bounded_traversal(start_id: &str, rel_type: &str, depth: u32, limit: u64) -> CypherQuery {
    let depth = clamp_depth(depth);
    let rel = sanitize_rel_type(rel_type);
    CypherQuery::new(format!(
        "MATCH path = (a:Entity {{id: $id}})-[:{rel}*1..{depth}]->(b:Entity) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN {PATH_PROJECTION} LIMIT {limit}"
    ))
    .with_param("id", start_id)
}

/// Whether any path of at most `max_hops` exists between two entities.
pub fn path_exists(from_id: &str, to_id: &str, max_hops: u32) -> CypherQuery {
    let max_hops = clamp_depth(max_hops);
    CypherQuery::new(format!(
        "MATCH (a:Entity {{id: $from}}), (b:Entity {{id: $to}}) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN exists((a)-[*..{max_hops}]-(b)) AS value"
    ))
    .with_param("from", from_id)
    .with_param("to", to_id)
}

/// Direct relationships between two entities.
pub fn relationships_between(a_id: &str, b_id: &str) -> CypherQuery {
    CypherQuery::new(
        "MATCH (a:Entity {id: $a})-[r]-(b:Entity {id: $b}) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN startNode(r).id AS source, endNode(r).id AS target, type(r) AS rel_type",
    )
    .with_param("a", a_id)
    .with_param("b", b_id)
}

/// Ids adjacent to both `a` and `b` (1-hop common neighborhood).
pub fn common_neighbors(a_id: &str, b_id: &str) -> CypherQuery {
    CypherQuery::new(
        "MATCH (a:Entity {id: $a})-[]-(n:Entity)-[]-(b:Entity {id: $b}) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL AND n.valid_to IS NULL \
         RETURN DISTINCT n.id AS id ORDER BY id",
    )
    .with_param("a", a_id)
    .with_param("b", b_id)
}

// ============================================================================
// Aggregates
// ============================================================================

/// Count of current entities.
pub fn count_entities() -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .return_item("count(e) AS value")
        .build()
        .expect("template is structurally valid")
}

/// (entity_type, count) over current entities.
pub fn count_by_type() -> CypherQuery {
    QueryBuilder::new()
        .match_pattern("(e:Entity)")
        .where_raw("e.valid_to IS NULL")
        .return_items(&["e.entity_type AS entity_type", "count(e) AS count"])
        .order_by("count", SortOrder::Desc)
        .build()
        .expect("template is structurally valid")
}

/// (rel_type, count) over relationships between current entities.
pub fn count_relationships_by_type() -> CypherQuery {
    CypherQuery::new(
        "MATCH (a:Entity)-[r]->(b:Entity) \
         WHERE a.valid_to IS NULL AND b.valid_to IS NULL \
         RETURN type(r) AS rel_type, count(r) AS count ORDER BY count DESC",
    )
}

/// Degree of one entity (edges to current endpoints, either direction).
pub fn entity_degree(entity_id: &str) -> CypherQuery {
    CypherQuery::new(
        "MATCH (e:Entity {id: $id}) WHERE e.valid_to IS NULL \
         OPTIONAL MATCH (e)-[r]-(m:Entity) WHERE m.valid_to IS NULL \
         RETURN count(r) AS value",
    )
    .with_param("id", entity_id)
}

/// Current entities ranked by degree, descending.
pub fn high_degree_entities(limit: u64) -> CypherQuery {
    CypherQuery::new(format!(
        "MATCH (e:Entity) WHERE e.valid_to IS NULL \
         OPTIONAL MATCH (e)-[r]-(m:Entity) WHERE m.valid_to IS NULL \
         WITH e, count(r) AS degree \
         RETURN e.id AS id, degree ORDER BY degree DESC, id ASC LIMIT {limit}"
    ))
}

/// Current entities with degree at most `max_degree`.
pub fn isolated_entities(max_degree: i64, limit: u64) -> CypherQuery {
    CypherQuery::new(format!(
        "MATCH (e:Entity) WHERE e.valid_to IS NULL \
         OPTIONAL MATCH (e)-[r]-(m:Entity) WHERE m.valid_to IS NULL \
         WITH e, count(r) AS degree WHERE degree <= $max_degree \
         RETURN e.id AS id, degree ORDER BY degree ASC, id ASC LIMIT {limit}"
    ))
    .with_param("max_degree", max_degree)
}

/// (degree, entity count) histogram over current entities.
pub fn degree_distribution() -> CypherQuery {
    CypherQuery::new(
        "MATCH (e:Entity) WHERE e.valid_to IS NULL \
         OPTIONAL MATCH (e)-[r]-(m:Entity) WHERE m.valid_to IS NULL \
         WITH e, count(r) AS degree \
         RETURN degree, count(e) AS entities ORDER BY degree",
    )
}

// ============================================================================
// Normalization
// ============================================================================

/// Merge the `nodes` / `edges` list columns of graph-template rows into one
/// deduplicated payload.
pub fn graph_payload_from_rows(rows: &[Row]) -> GraphPayload {
    let mut payload = GraphPayload::default();
    let mut seen_nodes = std::collections::HashSet::new();
    let mut seen_edges = std::collections::HashSet::new();

    for row in rows {
        if let Some(Value::Array(nodes)) = row.get("nodes") {
            for node in nodes {
                let id = node.get("id").and_then(Value::as_str).unwrap_or_default();
                if id.is_empty() || !seen_nodes.insert(id.to_string()) {
                    continue;
                }
                payload.nodes.push(PayloadNode {
                    id: id.to_string(),
                    entity_type: node
                        .get("entity_type")
                        .and_then(Value::as_str)
                        .unwrap_or("Entity")
                        .to_string(),
                    name: node
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(id)
                        .to_string(),
                });
            }
        }
        if let Some(Value::Array(edges)) = row.get("edges") {
            for edge in edges {
                let source = edge.get("source").and_then(Value::as_str).unwrap_or_default();
                let target = edge.get("target").and_then(Value::as_str).unwrap_or_default();
                let rel_type = edge
                    .get("rel_type")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if source.is_empty() || target.is_empty() {
                    continue;
                }
                let key = format!("{source}\u{1f}{target}\u{1f}{rel_type}");
                if seen_edges.insert(key) {
                    payload.edges.push(PayloadEdge {
                        source: source.to_string(),
                        target: target.to_string(),
                        rel_type: rel_type.to_string(),
                    });
                }
            }
        }
    }
    payload
}

/// First-row scalar under the conventional `value` column.
pub fn scalar_from_rows(rows: &[Row]) -> Option<Value> {
    rows.first().and_then(|row| row.get("value")).cloned()
}

/// First-row integer scalar.
pub fn scalar_i64_from_rows(rows: &[Row]) -> Option<i64> {
    rows.first().and_then(|row| row.i64_col("value"))
}
