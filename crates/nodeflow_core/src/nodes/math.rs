// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic on two float inputs.

use crate::descriptor::NodeDescriptor;
use crate::error::CoreResult;
use crate::node::{Node, NodeType, Status};
use crate::registry::TypeRegistry;
use crate::typed_attribute::{InputAttribute, OutputAttribute};
use crate::types::Float;

/// Operands of a binary math node
#[derive(Debug, Default)]
pub struct BinaryInputs {
    /// Left operand
    pub input1: InputAttribute<Float>,
    /// Right operand
    pub input2: InputAttribute<Float>,
}

/// Result of a binary math node
#[derive(Debug, Default)]
pub struct BinaryOutputs {
    /// Computed value
    pub result: OutputAttribute<Float>,
}

macro_rules! binary_math_node {
    ($(#[$meta:meta])* $name:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name {
            /// Operands
            pub inputs: BinaryInputs,
            /// Result
            pub outputs: BinaryOutputs,
        }

        impl Node for $name {
            fn compute(&self) -> Status {
                let $a = &self.inputs.input1;
                let $b = &self.inputs.input2;
                let value: CoreResult<Float> = $body;
                Status::from_result(
                    value.and_then(|v| self.outputs.result.set(v)),
                    stringify!($name),
                )
            }

            fn type_name(&self) -> &'static str {
                stringify!($name)
            }
        }

        impl NodeType for $name {
            fn initialize(registry: &TypeRegistry) -> NodeDescriptor {
                NodeDescriptor::new(stringify!($name))
                    .with_attribute(registry.attribute_descriptor("Input 1", |n: &mut Self| &mut n.inputs.input1))
                    .with_attribute(registry.attribute_descriptor("Input 2", |n: &mut Self| &mut n.inputs.input2))
                    .with_attribute(registry.attribute_descriptor("Result", |n: &mut Self| &mut n.outputs.result))
            }
        }
    };
}

binary_math_node!(
    /// `result = input1 + input2`
    AddNode,
    |a, b| a + b
);
binary_math_node!(
    /// `result = input1 - input2`
    SubtractNode,
    |a, b| a - b
);
binary_math_node!(
    /// `result = input1 * input2`
    MultiplyNode,
    |a, b| a * b
);
binary_math_node!(
    /// `result = input1 / input2`; a zero divisor fails the compute
    DivideNode,
    |a, b| a / b
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::descriptor::AttributeRole;
    use crate::event::EventBus;
    use crate::nodes::register_builtin_nodes;
    use crate::scene::Scene;
    use crate::types::register_core_types;

    fn scene() -> Scene {
        let registry = TypeRegistry::new();
        register_core_types(&registry);
        register_builtin_nodes(&registry);
        let config = SceneConfig {
            auto_evaluate: false,
            ..SceneConfig::default()
        };
        Scene::with_config(registry, EventBus::new(), config)
    }

    fn operands(inputs: &BinaryInputs, a: Float, b: Float) {
        inputs.input1.attribute().unwrap().set_value(a).unwrap();
        inputs.input2.attribute().unwrap().set_value(b).unwrap();
    }

    #[test]
    fn test_descriptor() {
        let registry = TypeRegistry::new();
        register_builtin_nodes(&registry);

        let desc = registry.node_descriptor::<AddNode>().unwrap();
        assert_eq!(desc.type_name, "AddNode");
        let names: Vec<_> = desc.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Input 1", "Input 2", "Result"]);
        assert_eq!(desc.attributes_with_role(AttributeRole::Output).count(), 1);
        assert_eq!(registry.node_descriptors().len(), 4);
    }

    #[test]
    fn test_arithmetic_nodes() {
        let scene = scene();
        let add = scene.add_node(AddNode::default()).unwrap();
        let sub = scene.add_node(SubtractNode::default()).unwrap();
        let mul = scene.add_node(MultiplyNode::default()).unwrap();
        let div = scene.add_node(DivideNode::default()).unwrap();
        for inputs in [&add.inputs, &sub.inputs, &mul.inputs, &div.inputs] {
            operands(inputs, 8.0, 2.0);
        }

        assert_eq!(add.compute(), Status::Ok);
        assert_eq!(sub.compute(), Status::Ok);
        assert_eq!(mul.compute(), Status::Ok);
        assert_eq!(div.compute(), Status::Ok);

        assert_eq!(add.outputs.result.get().unwrap(), 10.0);
        assert_eq!(sub.outputs.result.get().unwrap(), 6.0);
        assert_eq!(mul.outputs.result.get().unwrap(), 16.0);
        assert_eq!(div.outputs.result.get().unwrap(), 4.0);
    }

    #[test]
    fn test_divide_by_zero() {
        let scene = scene();
        let div = scene.add_node(DivideNode::default()).unwrap();
        operands(&div.inputs, 1.0, 0.0);

        assert_eq!(div.compute(), Status::Error);
        assert_eq!(div.outputs.result.get().unwrap(), 0.0);
    }

    #[test]
    fn test_unbound_node_fails() {
        assert_eq!(AddNode::default().compute(), Status::Error);
        assert_eq!(AddNode::default().type_name(), "AddNode");
    }
}
