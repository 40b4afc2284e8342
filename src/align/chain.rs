use crate::error::{ExtendError, Result};

/// 一段无空位的匹配：查询起点 i、目标起点 j、长度与得分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagonalSegment {
    pub i: i32,
    pub j: i32,
    pub len: i32,
    pub score: i32,
}

impl DiagonalSegment {
    pub fn new(i: i32, j: i32, len: i32, score: i32) -> Self {
        Self { i, j, len, score }
    }

    #[inline]
    pub fn diag(&self) -> i32 {
        self.i - self.j
    }

    #[inline]
    pub fn query_end(&self) -> i32 {
        self.i + self.len
    }

    #[inline]
    pub fn subject_end(&self) -> i32 {
        self.j + self.len
    }
}

pub type NodeId = usize;
pub type EdgeId = usize;

/// 链图节点：线段 + 沿最佳入边的前缀得分与路径得分包络
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagonalNode {
    pub seg: DiagonalSegment,
    pub prefix_score: i32,
    pub path_max: i32,
    pub path_min: i32,
    /// 最佳入边
    pub best_edge: Option<EdgeId>,
    /// 本节点入边链表的表头（最后插入的边）
    last_edge: Option<EdgeId>,
}

impl DiagonalNode {
    fn new(seg: DiagonalSegment) -> Self {
        Self {
            seg,
            prefix_score: seg.score,
            path_max: seg.score,
            path_min: seg.score,
            best_edge: None,
            last_edge: None,
        }
    }

    /// 前缀得分即路径最大值：该节点是所在链上的一个局部最高点
    pub fn is_maximum(&self) -> bool {
        self.path_max == self.prefix_score
    }
}

/// 从 `node_out` 剪接到 `node_in` 第 j 列的边
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub prefix_score: i32,
    pub path_max: i32,
    pub j: i32,
    pub path_min: i32,
    /// 剪接点处（空位罚分之后、进入 node_in 之前）的前缀得分
    pub prefix_score_begin: i32,
    pub node_in: NodeId,
    pub node_out: NodeId,
    prev: Option<EdgeId>,
}

impl Edge {
    pub fn new(
        prefix_score: i32,
        path_max: i32,
        j: i32,
        node_in: NodeId,
        node_out: NodeId,
        path_min: i32,
        prefix_score_begin: i32,
    ) -> Self {
        Self { prefix_score, path_max, j, path_min, prefix_score_begin, node_in, node_out, prev: None }
    }
}

/// 对角线链图。
///
/// 节点与边都放在 arena 中，以下标引用。每个节点的入边按插入顺序串成链表，
/// 查询某列之前的最佳入边时从最新的边向前扫描。节点按目标终点递增的顺序建边，
/// 只做贪心更新，不回头重算已完成的节点。
#[derive(Debug, Clone)]
pub struct DiagGraph {
    nodes: Vec<DiagonalNode>,
    edges: Vec<Edge>,
    edge_limit: usize,
}

impl Default for DiagGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagGraph {
    pub fn new() -> Self {
        Self::with_edge_limit(i32::MAX as usize)
    }

    pub fn with_edge_limit(edge_limit: usize) -> Self {
        Self { nodes: Vec::new(), edges: Vec::new(), edge_limit }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub fn add_node(&mut self, seg: DiagonalSegment) -> NodeId {
        self.nodes.push(DiagonalNode::new(seg));
        self.nodes.len() - 1
    }

    /// 开始为 `node` 建立入边；边数已达上限时返回 `TooManyEdges`
    pub fn init_node(&mut self, node: NodeId) -> Result<()> {
        self.check_capacity()?;
        let n = &mut self.nodes[node];
        n.last_edge = None;
        n.best_edge = None;
        n.prefix_score = n.seg.score;
        n.path_max = n.seg.score;
        n.path_min = n.seg.score;
        Ok(())
    }

    fn check_capacity(&self) -> Result<()> {
        if self.edges.len() >= self.edge_limit {
            return Err(ExtendError::TooManyEdges { limit: self.edge_limit });
        }
        Ok(())
    }

    /// 插入一条边；仅当新前缀更优时更新目标节点
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<EdgeId> {
        self.check_capacity()?;
        let id = self.edges.len();
        let node = &mut self.nodes[edge.node_in];
        edge.prev = node.last_edge;
        node.last_edge = Some(id);
        if edge.prefix_score > node.prefix_score {
            node.prefix_score = edge.prefix_score;
            node.path_max = edge.path_max;
            node.path_min = edge.path_min;
            node.best_edge = Some(id);
        }
        self.edges.push(edge);
        Ok(id)
    }

    /// 进入 `node` 的列早于 `j` 且前缀得分超过线段自身得分的最佳入边
    pub fn get_edge(&self, node: NodeId, j: i32) -> Option<&Edge> {
        let d = &self.nodes[node];
        let mut max_score = d.seg.score;
        let mut best = None;
        let mut cur = d.last_edge;
        while let Some(id) = cur {
            let e = &self.edges[id];
            if e.j < j && e.prefix_score > max_score {
                max_score = e.prefix_score;
                best = Some(e);
            }
            cur = e.prev;
        }
        best
    }

    /// 截止到 `node` 第 j 列之前的最佳前缀：(得分, path_max, path_min)
    pub fn prefix_score(&self, node: NodeId, j: i32) -> (i32, i32, i32) {
        let score = self.nodes[node].seg.score;
        match self.get_edge(node, j) {
            Some(e) => (score.max(e.prefix_score), score.max(e.path_max), e.path_min),
            None => (score, score, score),
        }
    }

    /// 前缀得分最高的节点（并列时取下标最小者）
    pub fn top_node(&self) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for (k, n) in self.nodes.iter().enumerate() {
            if best.map_or(true, |b| n.prefix_score > self.nodes[b].prefix_score) {
                best = Some(k);
            }
        }
        best
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &DiagonalNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn nodes(&self) -> &[DiagonalNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
