use super::domain::DomainProvider;
use super::filters::FilterTable;
use super::graph::InteractionGraph;
use super::graph::interaction::build_interaction_graph;
use super::models::subset::Subset;
use super::scoring::ScoreTable;
use std::sync::Arc;

/// Everything a search needs to know about the outside world.
///
/// A problem is an immutable snapshot: the engine only reads through it, and the same
/// problem can serve any number of queries.
#[derive(Debug, Clone)]
pub struct Problem {
    domains: Arc<dyn DomainProvider>,
    filter_tables: Vec<Arc<dyn FilterTable>>,
    score_tables: Vec<Arc<dyn ScoreTable>>,
}

impl Problem {
    pub fn new(domains: Arc<dyn DomainProvider>) -> Self {
        Self {
            domains,
            filter_tables: Vec::new(),
            score_tables: Vec::new(),
        }
    }

    pub fn with_filter_table(mut self, table: Arc<dyn FilterTable>) -> Self {
        self.filter_tables.push(table);
        self
    }

    pub fn with_score_table(mut self, table: Arc<dyn ScoreTable>) -> Self {
        self.score_tables.push(table);
        self
    }

    pub fn add_filter_table(&mut self, table: Arc<dyn FilterTable>) {
        self.filter_tables.push(table);
    }

    pub fn add_score_table(&mut self, table: Arc<dyn ScoreTable>) {
        self.score_tables.push(table);
    }

    #[inline]
    pub fn domains(&self) -> &dyn DomainProvider {
        self.domains.as_ref()
    }

    #[inline]
    pub fn filter_tables(&self) -> &[Arc<dyn FilterTable>] {
        &self.filter_tables
    }

    #[inline]
    pub fn score_tables(&self) -> &[Arc<dyn ScoreTable>] {
        &self.score_tables
    }

    /// Scopes reported by every filter and score table.
    pub fn interactions(&self) -> Vec<Subset> {
        self.filter_tables
            .iter()
            .flat_map(|t| t.interactions())
            .chain(self.score_tables.iter().flat_map(|t| t.interactions()))
            .collect()
    }

    /// Interaction graph over `variables`, restricted to the scopes of known constraints.
    pub fn interaction_graph(&self, variables: &Subset) -> InteractionGraph {
        build_interaction_graph(variables, &self.interactions())
    }
}
