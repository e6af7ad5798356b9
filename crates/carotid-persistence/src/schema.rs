//! Esquema Diesel (mantenido a mano, equivalente a `diesel print-schema`).

diesel::table! {
    mesh_artifacts (id) {
        id -> Uuid,
        patient_id -> Nullable<BigInt>,
        original_filename -> Text,
        stored_name -> Text,
        storage_location -> Text,
        byte_size -> BigInt,
        uploaded_at -> Timestamptz,
        status -> Text,
    }
}
