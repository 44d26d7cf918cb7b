//! Diff/Planner
//!
//! Compares declared configuration against stored state per resource
//! and produces an ordered change-set consistent with the dependency
//! graph. Planning is read-only; nothing is mutated.
//!
//! Ordering rules:
//! - create/update/replace entries follow forward topological order
//!   (dependencies before dependents),
//! - destroy entries follow reverse order (dependents before their
//!   dependencies),
//! - a destroy of a removed resource is sequenced before changes to
//!   anything it depended on.
//!
//! The result is a single linearization of the combined graph in which
//! destroy edges are inverted.

use crate::change::{ChangeEntry, ChangeKind, ChangeSet};
use crate::error::Result;
use crate::provider::ProviderRegistry;
use groundflow_core::{Address, AttrValue, DependencyGraph, Manifest};
use groundflow_state::StateDocument;
use std::collections::{HashMap, HashSet};

/// Outputs of a node that are not knowable until apply
enum Unstable {
    /// Create/Replace: every output changes
    All,
    /// Update: only the listed attributes change
    Attrs(HashSet<String>),
}

impl Unstable {
    fn covers(&self, attr: &str) -> bool {
        match self {
            Unstable::All => true,
            Unstable::Attrs(set) => set.contains(attr),
        }
    }
}

/// Compute the change-set reconciling `manifest` with `state`
pub fn plan(
    manifest: &Manifest,
    graph: &DependencyGraph,
    state: &StateDocument,
    registry: &ProviderRegistry,
) -> Result<ChangeSet> {
    let mut entries: Vec<ChangeEntry> = Vec::with_capacity(graph.len());
    let mut unstable: HashMap<Address, Unstable> = HashMap::new();

    for node in graph.topological() {
        let decl = &node.declaration;
        let address = node.address();
        let provider_cfg = manifest.provider_for(decl)?;
        let provider = registry.get(&provider_cfg.name)?;
        let schema = provider.schema(&decl.resource_type);
        let record = state.get_record(&address.to_string());

        // Which declared attributes differ from the applied snapshot?
        let mut changed: Vec<String> = Vec::new();
        if let Some(record) = record {
            for (attr_name, value) in &decl.attributes {
                let is_changed = match value {
                    AttrValue::Literal(v) => record.get_attribute(attr_name) != Some(v),
                    AttrValue::Reference { target, attr } => {
                        if unstable.get(target).is_some_and(|u| u.covers(attr)) {
                            // 参照先が作り直されるため、値は apply まで不明
                            true
                        } else {
                            let resolved = state
                                .get_record(&target.to_string())
                                .and_then(|r| r.get_attribute(attr));
                            resolved.is_none() || resolved != record.get_attribute(attr_name)
                        }
                    }
                };
                if is_changed {
                    changed.push(attr_name.clone());
                }
            }
        }

        let kind = match record {
            None => ChangeKind::Create,
            Some(_) if changed.is_empty() => ChangeKind::NoOp,
            Some(_) if changed.iter().all(|a| schema.mutable.contains(a)) => ChangeKind::Update,
            Some(_) => ChangeKind::Replace,
        };

        match kind {
            ChangeKind::Create | ChangeKind::Replace => {
                unstable.insert(address.clone(), Unstable::All);
            }
            ChangeKind::Update => {
                unstable.insert(
                    address.clone(),
                    Unstable::Attrs(changed.iter().cloned().collect()),
                );
            }
            _ => {}
        }

        entries.push(ChangeEntry {
            address,
            kind,
            provider: provider_cfg.name.clone(),
            provider_id: record.and_then(|r| r.provider_id.clone()),
            before: record.map(|r| r.attributes.clone()),
            desired: Some(decl.attributes.clone()),
            changed,
            depends_on: node.depends_on.clone(),
            sequence_after: node.depends_on.clone(),
        });
    }

    // Resources present in state but no longer declared
    for (addr_str, record) in &state.resources {
        let address: Address = addr_str.parse()?;
        if graph.contains(&address) {
            continue;
        }
        registry.get(&record.provider)?;

        let mut depends_on = Vec::with_capacity(record.dependencies.len());
        for dep in &record.dependencies {
            depends_on.push(dep.parse::<Address>()?);
        }

        entries.push(ChangeEntry {
            address,
            kind: ChangeKind::Destroy,
            provider: record.provider.clone(),
            provider_id: record.provider_id.clone(),
            before: Some(record.attributes.clone()),
            desired: None,
            changed: Vec::new(),
            depends_on,
            sequence_after: Vec::new(),
        });
    }

    add_destroy_edges(&mut entries);

    let entries = linearize(entries, graph);
    tracing::debug!(
        entries = entries.len(),
        serial = state.serial,
        "Plan computed"
    );
    Ok(ChangeSet::new(entries, state.serial))
}

/// Plan with every stored resource forced to Destroy
///
/// Declarations are ignored; ordering comes from the dependencies
/// recorded in state at apply time, inverted.
pub fn plan_destroy(state: &StateDocument, registry: &ProviderRegistry) -> Result<ChangeSet> {
    let mut entries: Vec<ChangeEntry> = Vec::with_capacity(state.len());

    for (addr_str, record) in &state.resources {
        let address: Address = addr_str.parse()?;
        registry.get(&record.provider)?;

        let mut depends_on = Vec::with_capacity(record.dependencies.len());
        for dep in &record.dependencies {
            depends_on.push(dep.parse::<Address>()?);
        }

        entries.push(ChangeEntry {
            address,
            kind: ChangeKind::Destroy,
            provider: record.provider.clone(),
            provider_id: record.provider_id.clone(),
            before: Some(record.attributes.clone()),
            desired: None,
            changed: Vec::new(),
            depends_on,
            sequence_after: Vec::new(),
        });
    }

    add_destroy_edges(&mut entries);

    // 空のグラフで線形化（全エントリがdestroyなのでtopo位置は不要）
    let entries = linearize(entries, &DependencyGraph::build(&[])?);
    Ok(ChangeSet::new(entries, state.serial))
}

/// Wire the inverted scheduling edges for destroy entries:
/// a destroyed dependent precedes the destruction (or change) of
/// everything it depended on.
fn add_destroy_edges(entries: &mut [ChangeEntry]) {
    let index: HashMap<Address, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.address.clone(), i))
        .collect();

    let mut edges: Vec<(usize, Address)> = Vec::new();
    for entry in entries.iter() {
        if entry.kind != ChangeKind::Destroy {
            continue;
        }
        for dep in &entry.depends_on {
            if let Some(&target) = index.get(dep) {
                edges.push((target, entry.address.clone()));
            }
        }
    }

    for (target, predecessor) in edges {
        if !entries[target].sequence_after.contains(&predecessor) {
            entries[target].sequence_after.push(predecessor);
        }
    }
}

/// Topological sort of the combined change graph
///
/// Deterministic: among ready entries, destroys come first (ordered by
/// address), then live entries in graph topological order.
fn linearize(entries: Vec<ChangeEntry>, graph: &DependencyGraph) -> Vec<ChangeEntry> {
    let n = entries.len();
    let index: HashMap<Address, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.address.clone(), i))
        .collect();

    let mut indegree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, entry) in entries.iter().enumerate() {
        for pred in &entry.sequence_after {
            if let Some(&p) = index.get(pred) {
                successors[p].push(i);
                indegree[i] += 1;
            }
        }
    }

    let priority = |entry: &ChangeEntry| -> (u8, usize, String) {
        match entry.kind {
            ChangeKind::Destroy => (0, 0, entry.address.to_string()),
            _ => (
                1,
                graph.topo_position(&entry.address).unwrap_or(usize::MAX),
                entry.address.to_string(),
            ),
        }
    };

    let mut emitted = vec![false; n];
    let mut order = Vec::with_capacity(n);

    for _ in 0..n {
        let next = (0..n)
            .filter(|&i| !emitted[i] && indegree[i] == 0)
            .min_by_key(|&i| priority(&entries[i]))
            .expect("combined change graph is acyclic");
        emitted[next] = true;
        for &s in &successors[next] {
            indegree[s] -= 1;
        }
        order.push(next);
    }

    // 計算した順位で並べ替える
    let mut rank = vec![0usize; n];
    for (r, &i) in order.iter().enumerate() {
        rank[i] = r;
    }
    let mut ranked: Vec<(usize, ChangeEntry)> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| (rank[i], entry))
        .collect();
    ranked.sort_by_key(|(r, _)| *r);
    ranked.into_iter().map(|(_, entry)| entry).collect()
}
