use std::collections::HashMap;

use serde_json::{json, Map};

use crate::{
    ink_list::InkList, object::RTObject, push_pop::PushPopType, story_error::StoryError,
    value_type::ValueType,
};

pub(crate) fn write_rtobject(o: &RTObject) -> Result<serde_json::Value, StoryError> {
    let value = match o {
        RTObject::Value(v) => write_value(v),
        RTObject::ControlCommand(c) => json!(c.name()),
        RTObject::NativeCall(op) => {
            let name = op.name();
            if name == "^" {
                json!("L^")
            } else {
                json!(name)
            }
        }
        RTObject::Divert(d) => {
            let key = if d.is_external {
                "x()"
            } else if d.pushes_to_stack && d.stack_push_type == PushPopType::Tunnel {
                "->t->"
            } else if d.pushes_to_stack {
                "f()"
            } else {
                "->"
            };

            let target = match (&d.variable_divert_name, &d.target_path) {
                (Some(name), _) => name.clone(),
                (None, Some(path)) => path.to_string(),
                (None, None) => String::new(),
            };

            let mut obj = Map::new();
            obj.insert(key.to_owned(), json!(target));
            if d.has_variable_target() {
                obj.insert("var".to_owned(), json!(true));
            }
            if d.is_conditional {
                obj.insert("c".to_owned(), json!(true));
            }
            if d.external_args > 0 {
                obj.insert("exArgs".to_owned(), json!(d.external_args));
            }
            serde_json::Value::Object(obj)
        }
        RTObject::ChoicePoint(cp) => {
            json!({"*": cp.path_on_choice.to_string(), "flg": cp.get_flags()})
        }
        RTObject::VariableReference(vr) => match &vr.path_for_count {
            Some(path) => json!({"CNT?": path.to_string()}),
            None => json!({"VAR?": vr.name}),
        },
        RTObject::VariableAssignment(va) => {
            let key = if va.is_global { "VAR=" } else { "temp=" };
            let mut obj = Map::new();
            obj.insert(key.to_owned(), json!(va.variable_name));
            if !va.is_new_declaration {
                obj.insert("re".to_owned(), json!(true));
            }
            serde_json::Value::Object(obj)
        }
        RTObject::Glue => json!("<>"),
        RTObject::Tag(text) => json!({"#": text}),
        RTObject::Void => json!("void"),
        RTObject::Container(_) => {
            return Err(StoryError::InvalidStoryState(
                "Containers can't be written to saved state".to_owned(),
            ))
        }
    };

    Ok(value)
}

pub(crate) fn write_value(v: &ValueType) -> serde_json::Value {
    match v {
        ValueType::Bool(b) => json!(b),
        ValueType::Int(i) => json!(i),
        ValueType::Float(f) => write_float(*f),
        ValueType::String(s) => {
            if s.is_newline {
                json!("\n")
            } else {
                json!(format!("^{}", s.string))
            }
        }
        ValueType::List(l) => write_ink_list(l),
        ValueType::DivertTarget(p) => json!({"^->": p.to_string()}),
        ValueType::VariablePointer(vp) => {
            json!({"^var": vp.variable_name, "ci": vp.context_index})
        }
    }
}

// JSON has no representation for infinities, write the nearest finite value.
fn write_float(f: f32) -> serde_json::Value {
    let f = if f.is_nan() {
        0.0
    } else {
        f.clamp(f32::MIN, f32::MAX)
    };

    let n = serde_json::Number::from_f64(f as f64).unwrap_or_else(|| serde_json::Number::from(0));
    serde_json::Value::Number(n)
}

fn write_ink_list(l: &InkList) -> serde_json::Value {
    let mut items = Map::new();
    for (item, value) in &l.items {
        items.insert(item.get_full_name(), json!(value));
    }

    let mut obj = Map::new();
    obj.insert("list".to_owned(), serde_json::Value::Object(items));

    if l.is_empty() {
        let origins = l.origin_names();
        if !origins.is_empty() {
            obj.insert("origins".to_owned(), json!(origins));
        }
    }

    serde_json::Value::Object(obj)
}

pub(crate) fn write_list_rt_objs(objs: &[RTObject]) -> Result<serde_json::Value, StoryError> {
    Ok(serde_json::Value::Array(
        objs.iter()
            .map(write_rtobject)
            .collect::<Result<Vec<_>, _>>()?,
    ))
}

pub(crate) fn write_dictionary_values(values: &HashMap<String, ValueType>) -> serde_json::Value {
    let mut obj = Map::new();
    for (k, v) in values {
        obj.insert(k.clone(), write_value(v));
    }
    serde_json::Value::Object(obj)
}

pub(crate) fn write_int_dictionary<'a>(
    map: impl IntoIterator<Item = (&'a String, &'a i32)>,
) -> serde_json::Value {
    let mut obj = Map::new();
    for (k, v) in map {
        obj.insert(k.clone(), json!(v));
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::json_read;

    #[test]
    fn values_read_back() {
        for v in [
            ValueType::Int(3),
            ValueType::Float(2.0),
            ValueType::new("hi"),
            ValueType::new("\n"),
            ValueType::Bool(true),
        ] {
            let back = json_read::jtoken_to_value(&write_value(&v)).unwrap();
            assert_eq!(v.get_cast_ordinal(), back.get_cast_ordinal());
            assert_eq!(v.to_string(), back.to_string());
        }
    }

    #[test]
    fn intersect_uses_list_name() {
        let op = crate::native_function_call::Op::Intersect;
        assert_eq!(json!("L^"), write_rtobject(&RTObject::NativeCall(op)).unwrap());
    }
}
