//! Ordered pass execution and the standard pipeline.

use tracing::{debug, info, instrument};

use tessera_ir::CircuitDag;

use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{
    CancelInverse, DirectionMapper, Optimize1qGates, SwapMapper, Unroller,
};
use crate::property::{BasisGates, CouplingMap, Layout, PropertySet, RoutingSettings};

/// An ordered list of passes sharing one [`PropertySet`].
///
/// A pass whose [`Pass::should_run`] declines is skipped; the first failing
/// pass stops the run and its error is returned as is.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// A manager with no passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Names of the passes, in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass over `dag` in order.
    #[instrument(skip(self, dag, properties), fields(circuit = dag.name()))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let ops_in = dag.num_ops();
        info!(passes = self.passes.len(), qubits = dag.num_qubits(), ops = ops_in, "compiling");

        for pass in &self.passes {
            if !pass.should_run(dag, properties) {
                debug!(pass = pass.name(), "skipped");
                continue;
            }
            let before = dag.num_ops();
            pass.run(dag, properties)?;
            debug!(pass = pass.name(), before, after = dag.num_ops(), "pass done");
        }

        info!(ops_in, ops_out = dag.num_ops(), depth = dag.depth(), "compiled");
        Ok(())
    }

    /// Number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether there are no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Builds the standard pipeline for a target.
///
/// Without a coupling map the pipeline is the [`Unroller`] alone. With one
/// it continues with [`SwapMapper`], a second [`Unroller`] for the inserted
/// swaps, [`DirectionMapper`], [`CancelInverse`] and [`Optimize1qGates`].
#[derive(Default)]
pub struct PassManagerBuilder {
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// A builder with empty properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all target properties at once.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Set only the basis gates.
    #[must_use]
    pub fn with_basis(mut self, basis_gates: BasisGates) -> Self {
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Set the initial layout the router starts its first trial from.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.properties.layout = Some(layout);
        self
    }

    /// Set the number of routing trials and the base seed.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingSettings) -> Self {
        self.properties.routing = routing;
        self
    }

    /// The pipeline for the collected properties, and the properties to
    /// run it with.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();
        pm.add_pass(Unroller::new());

        if self.properties.coupling_map.is_some() {
            pm.add_pass(SwapMapper);
            pm.add_pass(Unroller::new());
            pm.add_pass(DirectionMapper);
            pm.add_pass(CancelInverse::new());
            pm.add_pass(Optimize1qGates::new());
        }

        (pm, self.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::RoutingStats;
    use tessera_ir::Circuit;

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_empty_pass_manager_leaves_dag() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();
        let mut dag = CircuitDag::from_circuit(&Circuit::bell().unwrap()).unwrap();
        pm.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), 4);
    }

    #[test]
    fn test_builder_without_coupling_only_unrolls() {
        let (pm, props) = PassManagerBuilder::new()
            .with_basis(BasisGates::default())
            .build();
        assert_eq!(pm.pass_names(), vec!["Unroller"]);
        assert!(props.coupling_map.is_none());
    }

    #[test]
    fn test_builder_full_pipeline() {
        let (pm, props) = PassManagerBuilder::new()
            .with_target(CouplingMap::linear(5), BasisGates::default())
            .with_routing(RoutingSettings { trials: 4, seed: 7 })
            .build();

        assert_eq!(
            pm.pass_names(),
            vec![
                "Unroller",
                "SwapMapper",
                "Unroller",
                "DirectionMapper",
                "CancelInverse",
                "Optimize1qGates"
            ]
        );
        assert_eq!(props.routing.trials, 4);
    }

    #[test]
    fn test_full_pipeline_on_line() {
        let mut circuit = Circuit::with_size("line", 3, 0);
        circuit
            .h(("q", 0))
            .unwrap()
            .cx(("q", 0), ("q", 2))
            .unwrap();
        let (pm, mut props) = PassManagerBuilder::new()
            .with_target(CouplingMap::linear(3), BasisGates::default())
            .with_layout(Layout::trivial(3))
            .build();
        let mut dag = CircuitDag::from_circuit(&circuit).unwrap();
        pm.run(&mut dag, &mut props).unwrap();

        let coupling = props.coupling_map.as_ref().unwrap();
        for (_, inst) in dag.topological_ops() {
            assert!(BasisGates::default().contains(inst.name()), "{}", inst.name());
            if inst.qubits.len() == 2 {
                assert!(coupling.has_edge(inst.qubits[0].0, inst.qubits[1].0));
            }
        }
        assert_eq!(props.get::<RoutingStats>().map(|s| s.swaps), Some(1));
        assert!(props.layout.is_some());
    }
}
