mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn fresh_workspace_starts_from_stock_config() {
    let workspace = temp_dir("timetable-config-defaults");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let (code, _) = request_err(&mut stdin, &mut reader, "0", "config.get", json!({}));
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let cfg = request_ok(&mut stdin, &mut reader, "2", "config.get", json!({}));
    assert_eq!(cfg["groupNames"], json!(["DIA1", "DIA2"]));
    assert_eq!(cfg["rooms"], json!(["A", "B", "C", "D"]));
    assert_eq!(cfg["teachers"], json!(["Mme Camila", "Mr Boyer", "Mme Krika"]));
    assert_eq!(cfg["courseTypes"]["Physique CM"], "CM");
    assert_eq!(cfg["courseTypes"]["Physique TD"], "TD");
}

#[test]
fn config_update_replaces_lists_and_syncs_specialties() {
    let workspace = temp_dir("timetable-config-update");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "specialties.add",
        json!({ "teacher": "Mme Krika", "subject": "Maths TD" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "specialties.add",
        json!({ "teacher": "Mr Boyer", "subject": "Physique CM" }),
    );

    let cfg = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "config.update",
        json!({ "patch": {
            "teachers": ["Mr Boyer", " Mme Durand "],
            "rooms": ["A", "B"]
        } }),
    );
    assert_eq!(cfg["teachers"], json!(["Mr Boyer", "Mme Durand"]));
    assert_eq!(cfg["rooms"], json!(["A", "B"]));
    assert_eq!(cfg["teacherSpecialties"]["Mr Boyer"], json!(["Physique CM"]));
    assert_eq!(cfg["teacherSpecialties"]["Mme Durand"], json!([]));
    assert!(cfg["teacherSpecialties"].get("Mme Krika").is_none());

    // Persisted, not just echoed.
    let again = request_ok(&mut stdin, &mut reader, "5", "config.get", json!({}));
    assert_eq!(again["teacherSpecialties"], cfg["teacherSpecialties"]);
    assert_eq!(again["groupNames"], json!(["DIA1", "DIA2"]));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "config.update",
        json!({ "patch": { "students": ["x"] } }),
    );
    assert_eq!(code, "bad_params");
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "config.update",
        json!({ "patch": { "rooms": "A" } }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn specialties_toggle_add_remove() {
    let workspace = temp_dir("timetable-specialties");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let on = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "specialties.toggle",
        json!({ "teacher": "Mme Camila", "subject": "Maths CM" }),
    );
    assert_eq!(on["selected"], true);
    assert_eq!(on["specialties"], json!(["Maths CM"]));

    let dup = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "specialties.add",
        json!({ "teacher": "Mme Camila", "subject": "Maths CM" }),
    );
    assert_eq!(dup["specialties"], json!(["Maths CM"]));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "specialties.add",
        json!({ "teacher": "Mme Camila", "subject": "Maths TD" }),
    );
    let off = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "specialties.toggle",
        json!({ "teacher": "Mme Camila", "subject": "Maths CM" }),
    );
    assert_eq!(off["selected"], false);
    assert_eq!(off["specialties"], json!(["Maths TD"]));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "specialties.remove",
        json!({ "teacher": "Mme Camila", "subject": "Maths TD" }),
    );
    assert_eq!(removed["specialties"], json!([]));

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "specialties.toggle",
        json!({ "teacher": "Inconnu", "subject": "Maths CM" }),
    );
    assert_eq!(code, "bad_params");
    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "specialties.add",
        json!({ "teacher": "Mme Camila" }),
    );
    assert_eq!(code, "bad_params");
}
