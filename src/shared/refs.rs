/// Object-reference grammar helpers.
///
/// A bare ref is `workspace/object` (with an optional trailing version
/// segment), an UPA is the fully numeric `wsid/objid/ver` form, and a path is
/// one or more UPAs joined with `;`. Every UPA is also a valid ref.

pub fn is_upa(value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

pub fn is_upa_path(value: &str) -> bool {
    !value.trim().is_empty() && value.split(';').all(|segment| is_upa(segment.trim()))
}

pub fn is_ref(value: &str) -> bool {
    let parts: Vec<&str> = value.split('/').collect();
    (2..=3).contains(&parts.len()) && parts.iter().all(|part| !part.trim().is_empty())
}

pub fn join_ref(workspace: &str, object: &str) -> String {
    format!("{workspace}/{object}")
}
