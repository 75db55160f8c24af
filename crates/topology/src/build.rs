use crate::registry::{SemanticConventionRegistry, UnknownDomain};
use std::collections::HashMap;
use thiserror::Error;
use tracesynth_model::{
    AttributeGenerator, AttributeValue, CallCondition, CallStyle, DurationSpec, GeneratorError,
    TopologyConfig,
};

#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("operation {service}.{operation}: {source}")]
    InvalidConfig {
        service: String,
        operation: String,
        #[source]
        source: GeneratorError,
    },
    #[error("{service}.{operation} calls unresolved target {target_service}.{target_operation}")]
    UnresolvedTarget {
        service: String,
        operation: String,
        target_service: String,
        target_operation: String,
    },
    #[error("operation {service}.{operation}: {0}", service = .service, operation = .operation)]
    UnknownDomain {
        service: String,
        operation: String,
        #[source]
        source: UnknownDomainWrapper,
    },
    #[error("operation {service}.{operation}: error_rate must be in [0,1], got {error_rate}")]
    InvalidErrorRate {
        service: String,
        operation: String,
        error_rate: f64,
    },
    #[error("duplicate operation key {service}.{operation}")]
    DuplicateOperation { service: String, operation: String },
}

/// Wraps [`UnknownDomain`] so it can participate in `#[source]` without
/// making every `TopologyError` variant carry the same field shape.
#[derive(Debug, Error, PartialEq)]
#[error(transparent)]
pub struct UnknownDomainWrapper(#[from] pub UnknownDomain);

/// A resolved call edge: `target` is an index into [`Topology::operations`],
/// not a string lookup, so sampling dispatch is O(1).
#[derive(Debug, Clone)]
pub struct Call {
    pub target: usize,
    pub probability: f64,
    pub condition: CallCondition,
    pub count: u32,
    pub timeout: Option<std::time::Duration>,
    pub retries: u32,
    pub retry_backoff: std::time::Duration,
}

/// An operation after topology build: every call target resolved, every
/// attribute generator compiled, domain defaults merged in. Immutable for
/// the lifetime of the run.
#[derive(Debug)]
pub struct Operation {
    pub service: String,
    pub name: String,
    pub duration: DurationSpec,
    pub error_rate: f64,
    pub call_style: CallStyle,
    pub attributes: HashMap<String, AttributeGenerator>,
    pub calls: Vec<Call>,
    pub resource_attributes: HashMap<String, AttributeValue>,
    pub weight: u32,
}

impl Operation {
    pub fn key(&self) -> (&str, &str) {
        (self.service.as_str(), self.name.as_str())
    }
}

/// The compiled, immutable operation graph. Built once at startup by
/// [`Topology::build`]; every crate above this one (`traffic`, `sampler`,
/// `checker`, `collector`) addresses operations by index after an initial
/// `lookup`.
#[derive(Debug)]
pub struct Topology {
    operations: Vec<Operation>,
    index: HashMap<(String, String), usize>,
}

impl Topology {
    pub fn build(
        config: &TopologyConfig,
        registry: &dyn SemanticConventionRegistry,
    ) -> Result<Self, TopologyError> {
        let mut index = HashMap::new();
        let mut next_idx = 0usize;

        // First pass: allocate an index for every (service, operation) pair
        // so call targets declared anywhere in the config can be resolved
        // regardless of declaration order.
        for service in &config.services {
            for op in &service.operations {
                let key = (service.name.clone(), op.name.clone());
                if index.insert(key.clone(), next_idx).is_some() {
                    return Err(TopologyError::DuplicateOperation {
                        service: key.0,
                        operation: key.1,
                    });
                }
                next_idx += 1;
            }
        }

        let mut slot = 0usize;
        let mut compiled: Vec<Option<Operation>> = Vec::new();
        compiled.resize_with(index.len(), || None);

        for service in &config.services {
            for op in &service.operations {
                if op.error_rate < 0.0 || op.error_rate > 1.0 {
                    return Err(TopologyError::InvalidErrorRate {
                        service: service.name.clone(),
                        operation: op.name.clone(),
                        error_rate: op.error_rate,
                    });
                }

                let mut attribute_configs = op.attributes.clone();
                if let Some(domain) = &op.domain {
                    let domain_attrs =
                        registry
                            .attributes_for_domain(domain)
                            .map_err(|e| TopologyError::UnknownDomain {
                                service: service.name.clone(),
                                operation: op.name.clone(),
                                source: UnknownDomainWrapper(e),
                            })?;
                    for (k, v) in domain_attrs {
                        attribute_configs.entry(k).or_insert(v);
                    }
                }

                let mut attributes = HashMap::with_capacity(attribute_configs.len());
                for (name, cfg) in &attribute_configs {
                    let generator = cfg.compile().map_err(|source| TopologyError::InvalidConfig {
                        service: service.name.clone(),
                        operation: op.name.clone(),
                        source,
                    })?;
                    attributes.insert(name.clone(), generator);
                }

                let mut calls = Vec::with_capacity(op.calls.len());
                for call in &op.calls {
                    let target_key = (call.target_service.clone(), call.target_operation.clone());
                    let target = *index.get(&target_key).ok_or_else(|| {
                        TopologyError::UnresolvedTarget {
                            service: service.name.clone(),
                            operation: op.name.clone(),
                            target_service: call.target_service.clone(),
                            target_operation: call.target_operation.clone(),
                        }
                    })?;
                    calls.push(Call {
                        target,
                        probability: call.probability,
                        condition: call.condition,
                        count: call.count,
                        timeout: call.timeout,
                        retries: call.retries,
                        retry_backoff: call.retry_backoff,
                    });
                }

                let compiled_op = Operation {
                    service: service.name.clone(),
                    name: op.name.clone(),
                    duration: op.duration,
                    error_rate: op.error_rate,
                    call_style: op.call_style,
                    attributes,
                    calls,
                    resource_attributes: service.resource_attributes.clone(),
                    weight: op.weight,
                };

                let idx = index[&(service.name.clone(), op.name.clone())];
                compiled[idx] = Some(compiled_op);
                slot += 1;
            }
        }
        debug_assert_eq!(slot, compiled.len());

        let operations = compiled.into_iter().map(|o| o.expect("every index populated")).collect();
        Ok(Self { operations, index })
    }

    pub fn lookup(&self, service: &str, operation: &str) -> Option<&Operation> {
        self.index
            .get(&(service.to_string(), operation.to_string()))
            .map(|&idx| &self.operations[idx])
    }

    pub fn index_of(&self, service: &str, operation: &str) -> Option<usize> {
        self.index.get(&(service.to_string(), operation.to_string())).copied()
    }

    pub fn get(&self, idx: usize) -> &Operation {
        &self.operations[idx]
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Operation)> {
        self.operations.iter().enumerate()
    }

    /// All operation indices, every one of which is a valid root for trace
    /// generation; the emitter selects among them weighted by
    /// [`Operation::weight`].
    pub fn roots(&self) -> impl Iterator<Item = (usize, &Operation)> {
        self.operations.iter().enumerate()
    }

    /// Every operation index reachable from `root`, following calls
    /// regardless of probability (worst-case reachability, used by the
    /// static checker). Cycle-safe: visits each index at most once.
    pub fn reachable_from(&self, root: usize) -> Vec<usize> {
        let mut seen = vec![false; self.operations.len()];
        let mut stack = vec![root];
        let mut out = Vec::new();
        while let Some(idx) = stack.pop() {
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            out.push(idx);
            for call in &self.operations[idx].calls {
                if !seen[call.target] {
                    stack.push(call.target);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use std::time::Duration;
    use tracesynth_model::{
        CallConfig, OperationConfig, ServiceConfig, TrafficPatternConfig,
    };

    fn cfg_with_two_services() -> TopologyConfig {
        let mut a = ServiceConfig::new("a");
        let mut op_x = OperationConfig::new("x", DurationSpec::fixed(Duration::from_millis(10)));
        op_x.calls.push(CallConfig::new("b", "y"));
        a.operations.push(op_x);

        let mut b = ServiceConfig::new("b");
        b.operations
            .push(OperationConfig::new("y", DurationSpec::fixed(Duration::from_millis(5))));

        TopologyConfig {
            services: vec![a, b],
            traffic: TrafficPatternConfig::Uniform { rate: 1.0 },
            scenarios: vec![],
        }
    }

    #[test]
    fn resolves_call_targets_across_services() {
        let config = cfg_with_two_services();
        let topo = Topology::build(&config, &StaticRegistry::new()).unwrap();
        let x = topo.lookup("a", "x").unwrap();
        assert_eq!(x.calls.len(), 1);
        let target = topo.get(x.calls[0].target);
        assert_eq!(target.key(), ("b", "y"));
    }

    #[test]
    fn unresolved_target_is_an_error() {
        let mut config = cfg_with_two_services();
        config.services[0].operations[0].calls[0].target_operation = "missing".to_string();
        let err = Topology::build(&config, &StaticRegistry::new()).unwrap_err();
        assert!(matches!(err, TopologyError::UnresolvedTarget { .. }));
    }

    #[test]
    fn unknown_domain_is_an_error() {
        let mut config = cfg_with_two_services();
        config.services[0].operations[0].domain = Some("nonsense".to_string());
        let err = Topology::build(&config, &StaticRegistry::new()).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownDomain { .. }));
    }

    #[test]
    fn reachable_from_follows_cycles_without_looping_forever() {
        let mut config = cfg_with_two_services();
        config.services[1].operations[0]
            .calls
            .push(CallConfig::new("a", "x"));
        let topo = Topology::build(&config, &StaticRegistry::new()).unwrap();
        let root = topo.index_of("a", "x").unwrap();
        let reachable = topo.reachable_from(root);
        assert_eq!(reachable.len(), 2);
    }
}
