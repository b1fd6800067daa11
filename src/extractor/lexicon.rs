//! Closed lexicons and stop-word set for the rule-based extractor (spec
//! §4.F rules 3-4, 7). Small static slices — no perfect-hash crate needed
//! at this scale (see DESIGN.md).

pub const TECHNOLOGY: &[&str] = &[
    "rust", "python", "javascript", "typescript", "java", "golang", "kotlin",
    "swift", "ruby", "php", "c++", "sqlite", "postgres", "postgresql", "mysql",
    "redis", "mongodb", "kafka", "docker", "kubernetes", "grpc", "graphql",
    "rest", "http", "tcp", "udp", "tls", "ssl", "json", "yaml", "toml", "xml",
    "sqlite-vec", "tokio", "async", "webassembly", "wasm", "react", "vue",
    "angular", "nodejs", "deno", "bun", "git", "github", "gitlab", "aws",
    "azure", "gcp", "terraform", "ansible", "nginx", "linux", "unix",
    "llm", "embedding", "transformer", "onnx", "pytorch", "tensorflow",
];

pub const CONCEPT: &[&str] = &[
    "knowledge graph", "vector search", "semantic similarity", "machine learning",
    "natural language processing", "information retrieval", "graph traversal",
    "dense vector", "cosine similarity", "breadth first search", "content hash",
    "hierarchical index", "retrieval augmented generation", "concept extraction",
    "named entity recognition", "graph expansion", "edge weight", "document tree",
    "cross validation", "neural network", "attention mechanism", "feature vector",
];

/// Common capitalized sentence-leading words rejected by the proper-noun
/// rule, extended with a handful of technical-writing connectives.
pub const PROPER_NOUN_STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Those", "When", "Where", "What",
    "Which", "While", "With", "From", "Into", "Upon", "About", "After",
    "Before", "During", "Between", "Through", "Against", "Without",
    "Within", "Along", "Beyond", "Under", "Above", "Below", "Behind",
    "Here", "There", "Then", "Thus", "Also", "Even", "Just", "Only",
    "Some", "Many", "Much", "Most", "Other", "Such", "Each", "Every",
    "Both", "Either", "Neither", "All", "Any", "Few", "More", "Less",
    "But", "And", "For", "Nor", "Not", "Yet", "His", "Her", "Its",
    "Our", "Your", "Their", "Who", "How", "Why", "Can", "May", "Will",
    "Shall", "Should", "Would", "Could", "Must", "Has", "Have", "Had",
    "Was", "Were", "Been", "Being", "Are", "Now", "New", "Old",
    "Good", "Great", "Long", "First", "Last", "Next", "Like", "Over",
    "Still", "Back", "Well", "Down", "Off", "Come", "Made", "See",
    "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight",
    "Nine", "Ten", "Section", "Chapter", "Figure", "Table", "Note",
];
