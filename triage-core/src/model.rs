//! Cây quyết định, bộ mã hoá nhãn và quy trình huấn luyện một lần.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{TriageConfig, TriageError};

pub type NodeId = usize;

/// Gốc của mọi cây.
pub const ROOT: NodeId = 0;

/// Các cột triệu chứng của dữ liệu huấn luyện, theo thứ tự.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, TriageError> {
        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(TriageError::Model(format!(
                    "duplicate symptom column `{name}`"
                )));
            }
        }
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Tên triệu chứng theo thứ tự cột.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<usize, TriageError> {
        self.index_of(name)
            .ok_or_else(|| TriageError::UnknownSymptom(name.to_string()))
    }

    /// Vector hiện diện, bằng 1 tại mỗi triệu chứng được liệt kê.
    pub fn encode<S: AsRef<str>>(&self, symptoms: &[S]) -> Result<Vec<f64>, TriageError> {
        let mut vector = vec![0.0; self.names.len()];
        for symptom in symptoms {
            vector[self.require(symptom.as_ref())?] = 1.0;
        }
        Ok(vector)
    }
}

/// Các dòng đặc trưng, mỗi dòng một nhãn bệnh.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: FeatureSchema,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn new(
        schema: FeatureSchema,
        rows: Vec<Vec<f64>>,
        labels: Vec<String>,
    ) -> Result<Self, TriageError> {
        if rows.len() != labels.len() {
            return Err(TriageError::Model(format!(
                "{} feature rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if let Some((line, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != schema.len())
        {
            return Err(TriageError::Model(format!(
                "row {line} has {} values, expected {}",
                row.len(),
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            rows,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Ánh xạ tên bệnh sang chỉ số lớp theo thứ tự từ điển.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let classes: BTreeSet<&str> = labels.iter().map(|label| label.as_ref()).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, label: &str) -> Result<usize, TriageError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map_err(|_| TriageError::UnknownLabel(label.to_string()))
    }

    pub fn inverse_transform(&self, index: usize) -> Result<&str, TriageError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(TriageError::UnknownLabelIndex(index))
    }
}

/// Một nút của cây. Lá không có đặc trưng và phép tách.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    },
    Leaf {
        /// Số mẫu theo lớp; phần tử khác 0 là bệnh ứng viên.
        weights: Vec<f64>,
    },
}

impl Node {
    /// Đặc trưng tách, `None` với lá.
    pub fn feature(&self) -> Option<usize> {
        match self {
            Self::Split { feature, .. } => Some(*feature),
            Self::Leaf { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Cây phân loại nhị phân. Nút 0 là gốc, nút con luôn có id lớn hơn nút cha
/// nên mọi lượt duyệt đều dừng.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// Dựng cây từ các mảng song song; `None` trong `feature` đánh dấu lá.
    pub fn from_arrays(
        feature: &[Option<usize>],
        threshold: &[f64],
        children_left: &[Option<NodeId>],
        children_right: &[Option<NodeId>],
        value: &[Vec<f64>],
        n_features: usize,
    ) -> Result<Self, TriageError> {
        let count = feature.len();
        if count == 0 {
            return Err(TriageError::Model("tree has no nodes".to_string()));
        }
        if [
            threshold.len(),
            children_left.len(),
            children_right.len(),
            value.len(),
        ]
        .iter()
        .any(|len| *len != count)
        {
            return Err(TriageError::Model(
                "tree arrays have different lengths".to_string(),
            ));
        }

        let mut nodes = Vec::with_capacity(count);
        let mut n_classes = None;
        for id in 0..count {
            let node = match (feature[id], children_left[id], children_right[id]) {
                (Some(feature), Some(left), Some(right)) => {
                    if feature >= n_features {
                        return Err(TriageError::Model(format!(
                            "node {id} splits on feature {feature} of {n_features}"
                        )));
                    }
                    for child in [left, right] {
                        if child <= id || child >= count {
                            return Err(TriageError::Model(format!(
                                "node {id} has invalid child {child}"
                            )));
                        }
                    }
                    Node::Split {
                        feature,
                        threshold: threshold[id],
                        left,
                        right,
                    }
                }
                (None, None, None) => {
                    let weights = value[id].clone();
                    match n_classes {
                        None => n_classes = Some(weights.len()),
                        Some(expected) if expected != weights.len() => {
                            return Err(TriageError::Model(format!(
                                "leaf {id} has {} class weights, expected {expected}",
                                weights.len()
                            )));
                        }
                        Some(_) => {}
                    }
                    Node::Leaf { weights }
                }
                _ => {
                    return Err(TriageError::Model(format!(
                        "node {id} mixes split and leaf fields"
                    )));
                }
            };
            nodes.push(node);
        }

        Ok(Self {
            nodes,
            n_features,
            n_classes: n_classes.unwrap_or_default(),
        })
    }

    /// Huấn luyện cây CART theo Gini tới khi mọi lá thuần nhất hoặc không
    /// tách được nữa.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[usize],
        n_classes: usize,
    ) -> Result<Self, TriageError> {
        if rows.is_empty() {
            return Err(TriageError::Model(
                "cannot fit a tree on an empty training set".to_string(),
            ));
        }
        if rows.len() != targets.len() {
            return Err(TriageError::Model(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let n_features = rows[0].len();
        if rows.iter().any(|row| row.len() != n_features) {
            return Err(TriageError::Model("rows have different widths".to_string()));
        }
        if let Some(target) = targets.iter().find(|target| **target >= n_classes) {
            return Err(TriageError::UnknownLabelIndex(*target));
        }

        let mut builder = TreeBuilder {
            rows,
            targets,
            n_classes,
            nodes: Vec::new(),
        };
        builder.grow((0..rows.len()).collect());

        Ok(Self {
            nodes: builder.nodes,
            n_features,
            n_classes,
        })
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TriageError> {
        self.nodes
            .get(id)
            .ok_or_else(|| TriageError::Model(format!("node {id} does not exist")))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Độ dài đường dài nhất từ gốc tới lá, tính theo cạnh.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut deepest = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                depths[*left] = depths[id] + 1;
                depths[*right] = depths[id] + 1;
                deepest = deepest.max(depths[id] + 1);
            }
        }
        deepest
    }

    /// Lá mà vector đặc trưng đi tới.
    pub fn apply(&self, sample: &[f64]) -> Result<NodeId, TriageError> {
        if sample.len() != self.n_features {
            return Err(TriageError::Model(format!(
                "sample has {} features, tree expects {}",
                sample.len(),
                self.n_features
            )));
        }
        let mut id = ROOT;
        loop {
            match self.node(id)? {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { .. } => return Ok(id),
            }
        }
    }

    /// Lớp có trọng số lớn nhất tại lá; hoà thì lấy chỉ số nhỏ nhất.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, TriageError> {
        let leaf = self.apply(sample)?;
        match self.node(leaf)? {
            Node::Leaf { weights } => Ok(argmax(weights)),
            Node::Split { .. } => Err(TriageError::Model(format!(
                "descent stopped on split node {leaf}"
            ))),
        }
    }
}

fn argmax(weights: &[f64]) -> usize {
    let mut best = 0;
    for (index, weight) in weights.iter().enumerate() {
        if *weight > weights[best] {
            best = index;
        }
    }
    best
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, samples: Vec<usize>) -> NodeId {
        let id = self.nodes.len();
        let counts = self.class_counts(&samples);
        let split = self.best_split(&samples, &counts);
        self.nodes.push(Node::Leaf { weights: counts });

        if let Some(split) = split {
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|sample| self.rows[*sample][split.feature] <= split.threshold);
            let left = self.grow(left_samples);
            let right = self.grow(right_samples);
            self.nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
        }
        id
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for sample in samples {
            counts[self.targets[*sample]] += 1.0;
        }
        counts
    }

    fn best_split(&self, samples: &[usize], counts: &[f64]) -> Option<Candidate> {
        let total = samples.len() as f64;
        if gini(counts, total) <= 0.0 {
            return None;
        }

        let mut best: Option<Candidate> = None;
        let mut order = samples.to_vec();
        for feature in 0..self.rows[samples[0]].len() {
            order.sort_by(|a, b| self.rows[*a][feature].total_cmp(&self.rows[*b][feature]));

            let mut left = vec![0.0; self.n_classes];
            let mut right = counts.to_vec();
            for position in 0..order.len() - 1 {
                let class = self.targets[order[position]];
                left[class] += 1.0;
                right[class] -= 1.0;

                let current = self.rows[order[position]][feature];
                let next = self.rows[order[position + 1]][feature];
                if next <= current {
                    continue;
                }

                let n_left = (position + 1) as f64;
                let n_right = total - n_left;
                let impurity =
                    (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / total;
                if best
                    .as_ref()
                    .map_or(true, |candidate| impurity < candidate.impurity)
                {
                    best = Some(Candidate {
                        feature,
                        threshold: (current + next) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts
        .iter()
        .map(|count| (count / total).powi(2))
        .sum::<f64>()
}

/// Với mỗi bệnh: các triệu chứng có mặt trong ít nhất một dòng huấn luyện
/// của bệnh đó, theo thứ tự cột.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionProfiles {
    by_condition: HashMap<String, Vec<usize>>,
}

impl ConditionProfiles {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut present: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
        for (row, label) in dataset.rows.iter().zip(&dataset.labels) {
            let entry = present.entry(label.as_str()).or_default();
            entry.extend(
                row.iter()
                    .enumerate()
                    .filter(|(_, value)| **value != 0.0)
                    .map(|(index, _)| index),
            );
        }
        Self {
            by_condition: present
                .into_iter()
                .map(|(label, symptoms)| (label.to_string(), symptoms.into_iter().collect()))
                .collect(),
        }
    }

    pub fn insert(&mut self, condition: impl Into<String>, symptoms: Vec<usize>) {
        self.by_condition.insert(condition.into(), symptoms);
    }

    pub fn symptoms_for(&self, condition: &str) -> Result<&[usize], TriageError> {
        self.by_condition
            .get(condition)
            .map(Vec::as_slice)
            .ok_or_else(|| TriageError::UnknownLabel(condition.to_string()))
    }
}

/// Xáo trộn chỉ số dòng với hạt giống cố định rồi tách phần giữ lại.
/// Trả về `(train, test)`.
pub fn train_test_split(len: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test_len = ((len as f64) * test_fraction).ceil() as usize;
    let test = order.split_off(len - test_len.min(len));
    (order, test)
}

/// Độ chính xác trung bình qua k fold liên tiếp, mỗi fold một cây mới.
/// `None` khi số dòng ít hơn số fold.
pub fn cross_val_accuracy(
    rows: &[Vec<f64>],
    targets: &[usize],
    n_classes: usize,
    folds: usize,
) -> Result<Option<f64>, TriageError> {
    if folds < 2 {
        return Err(TriageError::Model(format!(
            "cross-validation needs at least 2 folds, got {folds}"
        )));
    }
    let len = rows.len();
    if len < folds {
        return Ok(None);
    }

    let mut start = 0;
    let mut total = 0.0;
    for fold in 0..folds {
        let size = len / folds + usize::from(fold < len % folds);
        let end = start + size;

        let mut train_rows = Vec::with_capacity(len - size);
        let mut train_targets = Vec::with_capacity(len - size);
        for index in (0..start).chain(end..len) {
            train_rows.push(rows[index].clone());
            train_targets.push(targets[index]);
        }
        let tree = DecisionTree::fit(&train_rows, &train_targets, n_classes)?;

        let mut correct = 0usize;
        for index in start..end {
            if tree.predict(&rows[index])? == targets[index] {
                correct += 1;
            }
        }
        let accuracy = correct as f64 / size as f64;
        debug!(fold, accuracy, "fold scored");
        total += accuracy;
        start = end;
    }
    Ok(Some(total / folds as f64))
}

/// Trạng thái đã huấn luyện, bất biến, dùng chung cho mọi phiên.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    schema: FeatureSchema,
    encoder: LabelEncoder,
    tree: DecisionTree,
    profiles: ConditionProfiles,
    accuracy: Option<f64>,
}

impl TrainedModel {
    /// Mã hoá nhãn, chia dữ liệu, huấn luyện cây và chấm điểm một lần.
    pub fn train(dataset: &Dataset, config: &TriageConfig) -> Result<Self, TriageError> {
        config.validate()?;
        if dataset.is_empty() {
            return Err(TriageError::Model("training set is empty".to_string()));
        }

        let encoder = LabelEncoder::fit(&dataset.labels);
        let targets = dataset
            .labels
            .iter()
            .map(|label| encoder.transform(label))
            .collect::<Result<Vec<_>, _>>()?;

        let (train, test) =
            train_test_split(dataset.len(), config.test_fraction, config.split_seed);
        let pick_rows = |indices: &[usize]| -> Vec<Vec<f64>> {
            indices.iter().map(|i| dataset.rows[*i].clone()).collect()
        };
        let pick_targets =
            |indices: &[usize]| -> Vec<usize> { indices.iter().map(|i| targets[*i]).collect() };

        let tree = DecisionTree::fit(&pick_rows(&train), &pick_targets(&train), encoder.len())?;
        let accuracy = cross_val_accuracy(
            &pick_rows(&test),
            &pick_targets(&test),
            encoder.len(),
            config.cv_folds,
        )?;

        info!(
            rows = dataset.len(),
            train = train.len(),
            held_out = test.len(),
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            accuracy = ?accuracy,
            "decision tree trained"
        );

        Self::from_parts(
            dataset.schema.clone(),
            encoder,
            tree,
            ConditionProfiles::from_dataset(dataset),
            accuracy,
        )
    }

    /// Ghép mô hình từ các phần có sẵn.
    pub fn from_parts(
        schema: FeatureSchema,
        encoder: LabelEncoder,
        tree: DecisionTree,
        profiles: ConditionProfiles,
        accuracy: Option<f64>,
    ) -> Result<Self, TriageError> {
        if tree.n_features() != schema.len() {
            return Err(TriageError::Model(format!(
                "tree expects {} features, schema has {}",
                tree.n_features(),
                schema.len()
            )));
        }
        if tree.n_classes() != encoder.len() {
            return Err(TriageError::Model(format!(
                "tree predicts {} classes, encoder knows {}",
                tree.n_classes(),
                encoder.len()
            )));
        }
        Ok(Self {
            schema,
            encoder,
            tree,
            profiles,
            accuracy,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn profiles(&self) -> &ConditionProfiles {
        &self.profiles
    }

    /// Độ chính xác kiểm định chéo trong `[0, 1]`.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// Nhãn bệnh có trọng số khác 0 tại lá.
    pub fn leaf_conditions(&self, leaf: NodeId) -> Result<Vec<String>, TriageError> {
        let Node::Leaf { weights } = self.tree.node(leaf)? else {
            return Err(TriageError::Model(format!("node {leaf} is not a leaf")));
        };
        let conditions = weights
            .iter()
            .enumerate()
            .filter(|(_, weight)| **weight != 0.0)
            .map(|(index, _)| self.encoder.inverse_transform(index).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        if conditions.is_empty() {
            return Err(TriageError::Model(format!("leaf {leaf} holds no condition")));
        }
        Ok(conditions)
    }

    /// Lỗi nếu tập dữ liệu khác không dùng đúng các cột huấn luyện.
    pub fn check_schema(&self, other: &FeatureSchema) -> Result<(), TriageError> {
        if other.names() == self.schema.names() {
            return Ok(());
        }
        let detail = match self
            .schema
            .names()
            .iter()
            .zip(other.names())
            .position(|(a, b)| a != b)
        {
            Some(position) => format!(
                "column {position} is `{}` in training but `{}` in testing",
                self.schema.names()[position],
                other.names()[position]
            ),
            None => format!(
                "training has {} columns, testing has {}",
                self.schema.len(),
                other.len()
            ),
        };
        Err(TriageError::SchemaMismatch(detail))
    }

    /// Tỷ lệ dòng được cây dự đoán đúng nhãn.
    pub fn score(&self, dataset: &Dataset) -> Result<f64, TriageError> {
        self.check_schema(&dataset.schema)?;
        if dataset.is_empty() {
            return Err(TriageError::Model("cannot score an empty dataset".to_string()));
        }
        let mut correct = 0usize;
        for (row, label) in dataset.rows.iter().zip(&dataset.labels) {
            if self.tree.predict(row)? == self.encoder.transform(label)? {
                correct += 1;
            }
        }
        Ok(correct as f64 / dataset.len() as f64)
    }
}
