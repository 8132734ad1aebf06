//! Module-call graph maintained alongside each committed snapshot.
//!
//! Nodes are module directories, edges point from the module whose manifest
//! records a local call to the directory the call resolves to. Callee nodes
//! need not be tracked modules; caller nodes always are.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use petgraph::prelude::*;
use petgraph::visit::{Dfs, Reversed};

use super::Module;

#[derive(Debug, Clone, Default)]
pub(crate) struct CallIndex {
    graph: DiGraph<PathBuf, ()>,
    nodes: HashMap<PathBuf, NodeIndex>,
}

impl CallIndex {
    pub(crate) fn build<'a>(modules: impl IntoIterator<Item = &'a Module>) -> CallIndex {
        let mut index = CallIndex::default();

        for module in modules {
            let Some(manifest) = module.manifest.payload.as_ref() else {
                continue;
            };
            let caller = index.node(&module.path);
            let callees = manifest
                .records
                .iter()
                .filter(|r| !r.is_root() && r.is_local())
                .map(|r| manifest.record_path(r))
                .unique()
                .collect_vec();
            for callee in callees {
                let callee = index.node(&callee);
                index.graph.update_edge(caller, callee, ());
            }
        }

        index
    }

    fn node(&mut self, path: &Path) -> NodeIndex {
        if let Some(idx) = self.nodes.get(path) {
            return *idx;
        }
        let idx = self.graph.add_node(path.to_path_buf());
        self.nodes.insert(path.to_path_buf(), idx);
        idx
    }

    /// Direct callers of `path`, sorted.
    pub(crate) fn callers(&self, path: &Path) -> Vec<PathBuf> {
        let Some(&idx) = self.nodes.get(path) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, Incoming)
            .map(|n| self.graph[n].clone())
            .sorted()
            .collect()
    }

    /// Every module that reaches `path` through one or more calls, sorted.
    pub(crate) fn transitive_callers(&self, path: &Path) -> Vec<PathBuf> {
        let Some(&start) = self.nodes.get(path) else {
            return vec![];
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut out = Vec::new();
        while let Some(node) = dfs.next(reversed) {
            if node != start {
                out.push(self.graph[node].clone());
            }
        }
        out.sort();
        out
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::datadir::{ModuleManifest, ModuleRecord};

    fn module_calling(path: &str, dirs: &[&str]) -> Module {
        let mut module = Module::new(PathBuf::from(path));
        let records = dirs
            .iter()
            .map(|dir| ModuleRecord {
                key: dir.replace('/', "."),
                source_addr: format!("./{dir}"),
                version: None,
                dir: PathBuf::from(dir),
            })
            .collect();
        module.manifest.payload = Some(Arc::new(ModuleManifest::new(path, records)));
        module
    }

    #[test]
    fn test_callers_and_transitive_callers() {
        let modules = [
            module_calling("/ws", &["app"]),
            module_calling("/ws/app", &["net"]),
            Module::new(PathBuf::from("/ws/app/net")),
            module_calling("/other", &["x"]),
        ];
        let index = CallIndex::build(modules.iter());

        assert_eq!(index.callers(Path::new("/ws/app")), vec![PathBuf::from("/ws")]);
        assert_eq!(
            index.callers(Path::new("/ws/app/net")),
            vec![PathBuf::from("/ws/app")]
        );
        assert_eq!(
            index.transitive_callers(Path::new("/ws/app/net")),
            vec![PathBuf::from("/ws"), PathBuf::from("/ws/app")]
        );
        assert!(index.callers(Path::new("/unknown")).is_empty());
        assert_eq!(index.edge_count(), 3);
    }

    #[test]
    fn test_cycles_terminate() {
        let modules = [module_calling("/a", &["../b"]), module_calling("/b", &["../a"])];
        let index = CallIndex::build(modules.iter());

        assert_eq!(
            index.transitive_callers(Path::new("/a")),
            vec![PathBuf::from("/b")]
        );
    }
}
