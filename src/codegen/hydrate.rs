//! Executable meaning of the synthesized constructors.
//!
//! A generated class's constructor hydrates an untyped data tree into a
//! typed instance tree, recursively. This module interprets those
//! structured constructor bodies over `serde_json::Value`, which is what
//! downstream consumers rely on and what the round-trip tests exercise.

use serde_json::{Map, Value};

use super::model::{ClassDef, ClassModel, CtorStep, DISCRIMINATOR, MethodDef};

/// Construct an instance of `class` from plain data.
///
/// Unknown classes pass the value through untouched (the static type was
/// not emitted here, e.g. a cross-document reference).
pub fn hydrate(model: &ClassModel, class: &str, props: &Value) -> Value {
    hydrate_at(model, class, props, 0)
}

fn hydrate_at(model: &ClassModel, class: &str, props: &Value, synthetic: usize) -> Value {
    let Some(def) = model.class(class) else {
        return props.clone();
    };
    // synthetic construction (no backing data) must not chase required
    // class-typed properties forever when the class graph is cyclic
    if synthetic > model.classes.len() {
        return Value::Null;
    }
    let mut out = Map::new();
    hydrate_into(model, def, props, synthetic, &mut out, 0);
    Value::Object(out)
}

fn hydrate_into(
    model: &ClassModel,
    def: &ClassDef,
    props: &Value,
    synthetic: usize,
    out: &mut Map<String, Value>,
    super_hops: usize,
) {
    let Some(ctor) = &def.ctor else {
        if let Value::Object(map) = props {
            out.extend(map.clone());
        }
        return;
    };

    // superclass first, with the same input; bounded against cyclic chains
    if ctor.calls_super && super_hops <= model.classes.len() {
        if let Some(superclass) = def.superclass().and_then(|s| model.class(s)) {
            hydrate_into(model, superclass, props, synthetic, out, super_hops + 1);
        }
    }

    // the concrete type survives upcasts through this stamp
    out.insert(
        DISCRIMINATOR.to_string(),
        Value::String(ctor.discriminator.to_string()),
    );

    for step in &ctor.steps {
        match step {
            CtorStep::Construct {
                prop,
                class,
                optional,
            } => match props.get(prop.as_str()) {
                Some(value) if !value.is_null() => {
                    out.insert(prop.to_string(), hydrate_at(model, class, value, 0));
                }
                _ if *optional => {}
                _ => {
                    let value = hydrate_at(model, class, &Value::Null, synthetic + 1);
                    out.insert(prop.to_string(), value);
                }
            },

            CtorStep::ConstructArray {
                prop,
                element_class,
            } => {
                if let Some(Value::Array(items)) = props.get(prop.as_str()) {
                    let mapped = items
                        .iter()
                        .map(|item| match element_class {
                            Some(class) => hydrate_at(model, class, item, 0),
                            None => item.clone(),
                        })
                        .collect();
                    out.insert(prop.to_string(), Value::Array(mapped));
                }
            }

            CtorStep::Assign { prop } => {
                if let Some(value) = props.get(prop.as_str()) {
                    out.insert(prop.to_string(), value.clone());
                }
            }
        }
    }
}

/// Invoke a choice-option setter on a hydrated instance.
///
/// Clears every sibling option slot and assigns `arg` to the method's own
/// slot, leaving at most one slot populated. Returns `false` when the
/// class or method is unknown or the instance is not an object.
pub fn apply_choice(
    model: &ClassModel,
    class: &str,
    instance: &mut Value,
    method: &str,
    arg: Value,
) -> bool {
    let Some(method_def) = find_method(model, class, method) else {
        return false;
    };
    let Value::Object(map) = instance else {
        return false;
    };
    for other in &method_def.clears {
        map.remove(other.as_str());
    }
    map.insert(method_def.sets.to_string(), arg);
    true
}

fn find_method<'a>(model: &'a ClassModel, class: &str, method: &str) -> Option<&'a MethodDef> {
    let mut current = model.class(class);
    let mut hops = 0;
    while let Some(def) = current {
        if let Some(found) = def.methods.iter().find(|m| m.name == method) {
            return Some(found);
        }
        hops += 1;
        if hops > model.classes.len() {
            break;
        }
        current = def.superclass().and_then(|s| model.class(s));
    }
    None
}

/// Remove every discriminator stamp from a hydrated instance tree.
///
/// The result is the plain-data shape a constructor accepts again.
pub fn strip_discriminators(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != DISCRIMINATOR)
                .map(|(key, nested)| (key.clone(), strip_discriminators(nested)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_discriminators).collect()),
        other => other.clone(),
    }
}
