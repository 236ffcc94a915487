use std::collections::HashMap;

use serde_json::Map;

use crate::{
    choice_point::ChoicePoint,
    container::{Container, ContainerArena},
    control_command::CommandType,
    divert::Divert,
    ink_list::InkList,
    ink_list_item::InkListItem,
    list_definition::ListDefinition,
    list_definitions_origin::ListDefinitionsOrigin,
    native_function_call::Op,
    object::RTObject,
    path::Path,
    push_pop::PushPopType,
    story::{INK_VERSION_CURRENT, INK_VERSION_MINIMUM_COMPATIBLE},
    story_error::StoryError,
    value_type::ValueType,
    variable_assignment::VariableAssignment,
    variable_reference::VariableReference,
};

/// Parses a story compiled by `inklecate`, returning its ink version, its
/// content and its list definitions.
pub(crate) fn load_from_string(
    s: &str,
) -> Result<(i32, ContainerArena, ListDefinitionsOrigin), StoryError> {
    let json: serde_json::Value = serde_json::from_str(s)?;

    let version = json
        .get("inkVersion")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| {
            StoryError::BadJson(
                "ink version number not found. Are you sure it's a valid .ink.json file?"
                    .to_owned(),
            )
        })? as i32;

    if !(INK_VERSION_MINIMUM_COMPATIBLE..=INK_VERSION_CURRENT).contains(&version) {
        return Err(StoryError::UnsupportedFormatVersion {
            version,
            min: INK_VERSION_MINIMUM_COMPATIBLE,
            max: INK_VERSION_CURRENT,
        });
    }

    let root = json.get("root").and_then(|r| r.as_array()).ok_or_else(|| {
        StoryError::BadJson(
            "Root node for ink not found. Are you sure it's a valid .ink.json file?".to_owned(),
        )
    })?;

    let mut arena = ContainerArena::new();
    jarray_to_container(&mut arena, root, None)?;
    arena.finalize();

    let list_defs = match json.get("listDefs") {
        Some(defs) => jtoken_to_list_definitions(defs)?,
        None => ListDefinitionsOrigin::default(),
    };

    Ok((version, arena, list_defs))
}

fn bad_token(token: &serde_json::Value) -> StoryError {
    StoryError::BadJson(format!(
        "Failed to convert token to runtime RTObject: {}",
        token
    ))
}

fn as_str<'a>(token: &'a serde_json::Value, what: &str) -> Result<&'a str, StoryError> {
    token
        .as_str()
        .ok_or_else(|| StoryError::BadJson(format!("Expected a string for {what}, found {token}")))
}

fn as_int(token: &serde_json::Value, what: &str) -> Result<i32, StoryError> {
    token
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| StoryError::BadJson(format!("Expected an integer for {what}, found {token}")))
}

fn content_token(
    arena: &mut ContainerArena,
    token: &serde_json::Value,
) -> Result<RTObject, StoryError> {
    match token {
        serde_json::Value::Array(a) => Ok(RTObject::Container(jarray_to_container(arena, a, None)?)),
        _ => jtoken_to_runtime_object(token),
    }
}

fn jarray_to_container(
    arena: &mut ContainerArena,
    jarray: &[serde_json::Value],
    name: Option<String>,
) -> Result<crate::container::ContainerId, StoryError> {
    // Final object in the array is always a combination of
    //  - named content
    //  - a "#f" key with the countFlags
    // (if either exists at all, otherwise null)
    let (terminator, items) = jarray
        .split_last()
        .ok_or_else(|| StoryError::BadJson("Empty container array".to_owned()))?;

    let mut name = name;
    let mut flags = 0;

    if let Some(terminator) = terminator.as_object() {
        if let Some(f) = terminator.get("#f") {
            flags = as_int(f, "container flags")?;
        }
        if let Some(n) = terminator.get("#n") {
            name = Some(as_str(n, "container name")?.to_owned());
        }
    }

    let id = arena.add(Container::new(name, flags));

    for item in items {
        let obj = content_token(arena, item)?;
        arena.add_content(id, obj);
    }

    if let Some(terminator) = terminator.as_object() {
        for (k, v) in terminator {
            if k == "#f" || k == "#n" {
                continue;
            }

            let sub = v.as_array().ok_or_else(|| {
                StoryError::BadJson(format!("Named content '{k}' is not a container"))
            })?;
            let child = jarray_to_container(arena, sub, Some(k.clone()))?;
            arena.add_named_only(id, k.clone(), child);
        }
    }

    Ok(id)
}

/// Converts any non-container token: values, commands, diverts, choice
/// points, variable access, glue, tags and void.
pub(crate) fn jtoken_to_runtime_object(token: &serde_json::Value) -> Result<RTObject, StoryError> {
    match token {
        serde_json::Value::Bool(value) => Ok(RTObject::Value(ValueType::Bool(*value))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let i = i32::try_from(i).map_err(|_| bad_token(token))?;
                Ok(RTObject::Value(ValueType::Int(i)))
            } else {
                let f = n.as_f64().ok_or_else(|| bad_token(token))?;
                Ok(RTObject::Value(ValueType::Float(f as f32)))
            }
        }
        serde_json::Value::String(s) => jstring_to_runtime_object(s).ok_or_else(|| bad_token(token)),
        serde_json::Value::Object(obj) => jobject_to_runtime_object(obj)?.ok_or_else(|| bad_token(token)),
        serde_json::Value::Null | serde_json::Value::Array(_) => Err(bad_token(token)),
    }
}

fn jstring_to_runtime_object(s: &str) -> Option<RTObject> {
    // String value
    if let Some(text) = s.strip_prefix('^') {
        return Some(RTObject::Value(ValueType::new(text)));
    }
    if s == "\n" {
        return Some(RTObject::Value(ValueType::new("\n")));
    }

    // Glue
    if s == "<>" {
        return Some(RTObject::Glue);
    }

    if let Some(command) = CommandType::from_name(s) {
        return Some(RTObject::ControlCommand(command));
    }

    // Native functions. "^" conflicts with the way to identify strings, so
    // intersection is written as "L^".
    let call_name = if s == "L^" { "^" } else { s };
    if let Some(op) = Op::from_name(call_name) {
        return Some(RTObject::NativeCall(op));
    }

    if s == "void" {
        return Some(RTObject::Void);
    }

    None
}

fn jobject_to_runtime_object(
    obj: &Map<String, serde_json::Value>,
) -> Result<Option<RTObject>, StoryError> {
    // Divert target value to path
    if let Some(v) = obj.get("^->") {
        return Ok(Some(RTObject::Value(ValueType::DivertTarget(
            Path::new_with_components_string(as_str(v, "divert target")?),
        ))));
    }

    // VariablePointerValue
    if let Some(v) = obj.get("^var") {
        let context_index = match obj.get("ci") {
            Some(ci) => as_int(ci, "context index")?,
            None => -1,
        };

        return Ok(Some(RTObject::Value(ValueType::new_variable_pointer(
            as_str(v, "variable pointer")?,
            context_index,
        ))));
    }

    // Divert
    let divert_kind = [
        ("->", false, PushPopType::Function, false),
        ("f()", true, PushPopType::Function, false),
        ("->t->", true, PushPopType::Tunnel, false),
        ("x()", false, PushPopType::Function, true),
    ]
    .into_iter()
    .find_map(|(key, pushes, push_type, external)| {
        obj.get(key).map(|v| (v, pushes, push_type, external))
    });

    if let Some((target, pushes_to_stack, push_type, external)) = divert_kind {
        let target = as_str(target, "divert")?.to_owned();

        let (var_divert_name, target_path) = if obj.contains_key("var") {
            (Some(target), None)
        } else {
            (None, Some(target))
        };

        let external_args = match obj.get("exArgs") {
            Some(n) if external => as_int(n, "external args")? as usize,
            _ => 0,
        };

        return Ok(Some(RTObject::Divert(Divert::new(
            pushes_to_stack,
            push_type,
            external,
            external_args,
            obj.contains_key("c"),
            var_divert_name,
            target_path.as_deref(),
        ))));
    }

    // Choice
    if let Some(cp) = obj.get("*") {
        let flags = match obj.get("flg") {
            Some(f) => as_int(f, "choice flags")?,
            None => 0,
        };

        return Ok(Some(RTObject::ChoicePoint(ChoicePoint::new(
            flags,
            as_str(cp, "choice path")?,
        ))));
    }

    // Variable reference
    if let Some(name) = obj.get("VAR?") {
        return Ok(Some(RTObject::VariableReference(VariableReference::new(
            as_str(name, "variable reference")?,
        ))));
    }

    if let Some(path) = obj.get("CNT?") {
        return Ok(Some(RTObject::VariableReference(
            VariableReference::from_path_for_count(as_str(path, "read count")?),
        )));
    }

    // Variable assignment
    let assignment = obj
        .get("VAR=")
        .map(|v| (v, true))
        .or_else(|| obj.get("temp=").map(|v| (v, false)));

    if let Some((name, is_global)) = assignment {
        let is_new_declaration = !obj.contains_key("re");

        return Ok(Some(RTObject::VariableAssignment(VariableAssignment::new(
            as_str(name, "variable assignment")?,
            is_new_declaration,
            is_global,
        ))));
    }

    // Legacy tag
    if let Some(text) = obj.get("#") {
        return Ok(Some(RTObject::Tag(as_str(text, "tag")?.to_owned())));
    }

    // List value
    if let Some(content) = obj.get("list") {
        let content = content
            .as_object()
            .ok_or_else(|| StoryError::BadJson("List value is not an object".to_owned()))?;

        let mut raw_list = InkList::new();

        if let Some(origins) = obj.get("origins").and_then(|o| o.as_array()) {
            let names = origins
                .iter()
                .map(|n| as_str(n, "list origin").map(str::to_owned))
                .collect::<Result<Vec<String>, StoryError>>()?;
            raw_list.set_initial_origin_names(names);
        }

        for (k, v) in content {
            raw_list
                .items
                .insert(InkListItem::from_full_name(k), as_int(v, "list item value")?);
        }

        return Ok(Some(RTObject::Value(ValueType::List(raw_list))));
    }

    Ok(None)
}

pub(crate) fn jarray_to_runtime_obj_list(
    jarray: &[serde_json::Value],
) -> Result<Vec<RTObject>, StoryError> {
    jarray.iter().map(jtoken_to_runtime_object).collect()
}

pub(crate) fn jtoken_to_value(token: &serde_json::Value) -> Result<ValueType, StoryError> {
    match jtoken_to_runtime_object(token)? {
        RTObject::Value(v) => Ok(v),
        other => Err(StoryError::BadJson(format!("Expected a value, found {other}"))),
    }
}

pub(crate) fn jtoken_to_list_definitions(
    def: &serde_json::Value,
) -> Result<ListDefinitionsOrigin, StoryError> {
    let defs = def
        .as_object()
        .ok_or_else(|| StoryError::BadJson("listDefs is not an object".to_owned()))?;

    let mut all_defs: Vec<ListDefinition> = Vec::with_capacity(defs.len());

    for (name, list_def_json) in defs {
        let items_json = list_def_json.as_object().ok_or_else(|| {
            StoryError::BadJson(format!("List definition '{name}' is not an object"))
        })?;

        let mut items: HashMap<String, i32> = HashMap::new();
        for (k, v) in items_json {
            items.insert(k.clone(), as_int(v, "list item value")?);
        }

        all_defs.push(ListDefinition::new(name.clone(), items));
    }

    Ok(ListDefinitionsOrigin::new(all_defs))
}

pub(crate) fn jobject_to_hashmap_values(
    jobj: &Map<String, serde_json::Value>,
) -> Result<HashMap<String, ValueType>, StoryError> {
    jobj.iter()
        .map(|(k, v)| Ok((k.clone(), jtoken_to_value(v)?)))
        .collect()
}

pub(crate) fn jobject_to_int_hashmap(
    jobj: &Map<String, serde_json::Value>,
) -> Result<HashMap<String, i32>, StoryError> {
    jobj.iter()
        .map(|(k, v)| Ok((k.clone(), as_int(v, k)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_load() {
        let s = r##"{"inkVersion":21,"root":[["^Line.","\n",["done",{"#n":"g-0"}],null],"done",null],"listDefs":{}}"##;
        let (version, arena, _) = load_from_string(s).unwrap();
        assert_eq!(21, version);
        let first = arena.get(arena.root()).content[0].clone();
        assert!(matches!(first, RTObject::Container(_)));
    }

    #[test]
    fn load_choice() {
        let s = r##"{"inkVersion":21,"root":[["^Hello world!","\n","ev","str","^Hello back!","/str","/ev",{"*":"0.c-0","flg":20},{"c-0":["\n","done",{"->":"0.g-0"},{"#f":5}],"g-0":["done",null]}],"done",null],"listDefs":{}}"##;
        let (_, arena, _) = load_from_string(s).unwrap();
        let p = arena
            .pointer_at_path(&Path::new_with_components_string("0.c-0"))
            .unwrap();
        assert!(arena.get(p.container.unwrap()).visits_should_be_counted);
    }

    #[test]
    fn load_list_definitions() {
        let s = r##"{"inkVersion":21,"root":[["done",null],"done",null],"listDefs":{"a":{"A":1,"B":2}}}"##;
        let (_, _, defs) = load_from_string(s).unwrap();
        assert!(defs.get_list_definition("a").unwrap().contains_item_with_name("B"));
        assert!(defs.find_single_item_list_with_name("a.A").is_some());
    }

    #[test]
    fn rejects_future_versions() {
        let s = r##"{"inkVersion":99,"root":[["done",null],"done",null]}"##;
        assert!(matches!(
            load_from_string(s),
            Err(StoryError::UnsupportedFormatVersion { version: 99, .. })
        ));
    }

    #[test]
    fn rejects_unknown_tokens() {
        let s = r##"{"inkVersion":21,"root":[["what is this",null],"done",null]}"##;
        assert!(matches!(load_from_string(s), Err(StoryError::BadJson(_))));
    }
}
