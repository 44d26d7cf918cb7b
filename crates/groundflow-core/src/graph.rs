//! 依存グラフ
//!
//! リソース宣言の参照と depends_on を解決し、トポロジカル順序付け
//! 可能なDAGを構築します。構築は純粋な変換で、副作用はありません。

use crate::error::{ManifestError, Result};
use crate::model::{Address, ResourceDeclaration};
use std::collections::HashMap;

/// グラフノード
///
/// リソース宣言と、解決済みの依存先アドレスを保持します。
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub declaration: ResourceDeclaration,

    /// 直接依存するリソース（参照 + depends_on、重複除去済み）
    pub depends_on: Vec<Address>,
}

impl ResourceNode {
    pub fn address(&self) -> Address {
        self.declaration.address()
    }
}

/// リソース依存グラフ
///
/// 不変条件: 非循環。循環を含む宣言集合からは構築できず、
/// 部分的なグラフが返ることはありません。
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// 宣言順のノード
    nodes: Vec<ResourceNode>,

    /// アドレス → ノードインデックス
    index: HashMap<Address, usize>,

    /// ノード → 依存先インデックス
    edges: Vec<Vec<usize>>,

    /// ノード → 依存元（逆辺）インデックス
    reverse_edges: Vec<Vec<usize>>,

    /// トポロジカル順序（依存先が依存元より先）
    topo: Vec<usize>,
}

impl DependencyGraph {
    /// 宣言集合からグラフを構築
    ///
    /// 存在しないリソースへの参照は `UnresolvedReference`、
    /// 循環は `CircularDependency` で失敗します。
    pub fn build(resources: &[ResourceDeclaration]) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, decl) in resources.iter().enumerate() {
            if index.insert(decl.address(), i).is_some() {
                return Err(ManifestError::DuplicateResource(decl.address().to_string()));
            }
        }

        let mut nodes = Vec::with_capacity(resources.len());
        let mut edges = Vec::with_capacity(resources.len());
        for decl in resources {
            let depends_on = decl.dependency_addresses();
            let mut deps = Vec::with_capacity(depends_on.len());
            for target in &depends_on {
                match index.get(target) {
                    Some(&t) => deps.push(t),
                    None => {
                        return Err(ManifestError::UnresolvedReference {
                            from: decl.address().to_string(),
                            to: target.to_string(),
                        });
                    }
                }
            }
            nodes.push(ResourceNode {
                declaration: decl.clone(),
                depends_on,
            });
            edges.push(deps);
        }

        let mut reverse_edges = vec![Vec::new(); nodes.len()];
        for (node, deps) in edges.iter().enumerate() {
            for &dep in deps {
                reverse_edges[dep].push(node);
            }
        }

        let topo = toposort(&nodes, &edges)?;

        tracing::debug!(
            resources = nodes.len(),
            edges = edges.iter().map(|e| e.len()).sum::<usize>(),
            "Dependency graph built"
        );

        Ok(Self {
            nodes,
            index,
            edges,
            reverse_edges,
            topo,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 辺の総数
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(|e| e.len()).sum()
    }

    pub fn get(&self, address: &Address) -> Option<&ResourceNode> {
        self.index.get(address).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.index.contains_key(address)
    }

    /// 宣言順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    /// トポロジカル順（依存先 → 依存元）のイテレータ
    pub fn topological(&self) -> impl Iterator<Item = &ResourceNode> {
        self.topo.iter().map(|&i| &self.nodes[i])
    }

    /// 逆トポロジカル順（依存元 → 依存先）のイテレータ
    pub fn reverse_topological(&self) -> impl Iterator<Item = &ResourceNode> {
        self.topo.iter().rev().map(|&i| &self.nodes[i])
    }

    /// トポロジカル順序内での位置（安定な順序付けのタイブレークに使用）
    pub fn topo_position(&self, address: &Address) -> Option<usize> {
        let i = *self.index.get(address)?;
        self.topo.iter().position(|&n| n == i)
    }

    /// 直接の依存元（このリソースに依存しているリソース）
    pub fn dependents_of(&self, address: &Address) -> Vec<Address> {
        match self.index.get(address) {
            Some(&i) => self.reverse_edges[i]
                .iter()
                .map(|&d| self.nodes[d].address())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// 深さ優先探索によるトポロジカルソート
///
/// 再帰スタック上のノードに再訪した場合は循環として検出し、
/// 循環経路をエラーメッセージに含めます。
fn toposort(nodes: &[ResourceNode], edges: &[Vec<usize>]) -> Result<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InStack,
        Done,
    }

    fn visit(
        node: usize,
        nodes: &[ResourceNode],
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InStack => {
                // stack の先頭から循環の始点を探して経路を組み立てる
                let start = stack.iter().position(|&n| n == node).unwrap_or(0);
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .map(|&n| nodes[n].address().to_string())
                    .collect();
                path.push(nodes[node].address().to_string());
                return Err(ManifestError::CircularDependency(path.join(" -> ")));
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::InStack;
        stack.push(node);
        for &dep in &edges[node] {
            visit(dep, nodes, edges, marks, stack, order)?;
        }
        stack.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(nodes.len());
    for node in 0..nodes.len() {
        visit(node, nodes, edges, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttrValue;
    use std::collections::BTreeMap;

    fn decl(resource_type: &str, name: &str, deps: &[&str]) -> ResourceDeclaration {
        ResourceDeclaration {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            provider: None,
            attributes: BTreeMap::new(),
            depends_on: deps.iter().map(|d| d.parse().unwrap()).collect(),
        }
    }

    fn decl_with_ref(
        resource_type: &str,
        name: &str,
        attr: &str,
        target: &str,
        target_attr: &str,
    ) -> ResourceDeclaration {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            attr.to_string(),
            AttrValue::reference(target.parse().unwrap(), target_attr),
        );
        ResourceDeclaration {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            provider: None,
            attributes,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        // ダイヤモンド: vpc <- {subnet-a, subnet-b} <- cluster
        let resources = vec![
            decl("cluster", "main", &["subnet:a", "subnet:b"]),
            decl("subnet", "a", &["vpc:main"]),
            decl("subnet", "b", &["vpc:main"]),
            decl("vpc", "main", &[]),
        ];

        let graph = DependencyGraph::build(&resources).unwrap();
        let order: Vec<String> = graph
            .topological()
            .map(|n| n.address().to_string())
            .collect();

        // すべての辺が「依存先が先」を満たすこと
        for node in graph.iter() {
            let pos = |a: &str| order.iter().position(|o| o == a).unwrap();
            for dep in &node.depends_on {
                assert!(
                    pos(&dep.to_string()) < pos(&node.address().to_string()),
                    "{} は {} より後に並ぶべき",
                    node.address(),
                    dep
                );
            }
        }
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_reference_creates_edge() {
        let resources = vec![
            decl("vpc", "main", &[]),
            decl_with_ref("subnet", "public-a", "vpc_id", "vpc:main", "id"),
        ];

        let graph = DependencyGraph::build(&resources).unwrap();
        let subnet = graph.get(&Address::new("subnet", "public-a")).unwrap();
        assert_eq!(subnet.depends_on, vec![Address::new("vpc", "main")]);
        assert_eq!(
            graph.dependents_of(&Address::new("vpc", "main")),
            vec![Address::new("subnet", "public-a")]
        );
    }

    #[test]
    fn test_cycle_is_fatal() {
        let resources = vec![
            decl("a", "x", &["b:y"]),
            decl("b", "y", &["c:z"]),
            decl("c", "z", &["a:x"]),
        ];

        let err = DependencyGraph::build(&resources).unwrap_err();
        match err {
            ManifestError::CircularDependency(path) => {
                assert!(path.contains("a:x"), "循環経路が含まれるべき: {path}");
            }
            other => panic!("CircularDependency を期待: {other:?}"),
        }
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let resources = vec![decl("a", "x", &["a:x"])];
        assert!(matches!(
            DependencyGraph::build(&resources),
            Err(ManifestError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_unresolved_reference() {
        let resources = vec![decl_with_ref("subnet", "a", "vpc_id", "vpc:missing", "id")];
        let err = DependencyGraph::build(&resources).unwrap_err();
        assert!(matches!(err, ManifestError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_duplicate_address() {
        let resources = vec![decl("vpc", "main", &[]), decl("vpc", "main", &[])];
        assert!(matches!(
            DependencyGraph::build(&resources),
            Err(ManifestError::DuplicateResource(_))
        ));
    }

    #[test]
    fn test_reverse_topological_is_reversed() {
        let resources = vec![decl("vpc", "main", &[]), decl("subnet", "a", &["vpc:main"])];
        let graph = DependencyGraph::build(&resources).unwrap();

        let forward: Vec<_> = graph.topological().map(|n| n.address()).collect();
        let mut reverse: Vec<_> = graph.reverse_topological().map(|n| n.address()).collect();
        reverse.reverse();
        assert_eq!(forward, reverse);
    }
}
