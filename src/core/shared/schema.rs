diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        password_hash -> Text,
        phone -> Varchar,
        address -> Text,
        role -> SmallInt,
        department -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    citizens (id) {
        id -> Uuid,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    issue_categories (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Nullable<Text>,
        department -> Varchar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    issues (id) {
        id -> Uuid,
        citizen_id -> Uuid,
        title -> Varchar,
        description -> Text,
        category_id -> Uuid,
        priority -> SmallInt,
        status -> SmallInt,
        assigned_to -> Nullable<Uuid>,
        remarks -> Nullable<Text>,
        resolution_note -> Nullable<Text>,
        created_at -> Timestamptz,
        modified_at -> Timestamptz,
        modified_by -> Nullable<Uuid>,
        resolved_at -> Nullable<Timestamptz>,
        closed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    issue_updates (id) {
        id -> Uuid,
        issue_id -> Uuid,
        author_id -> Uuid,
        old_status -> Nullable<SmallInt>,
        new_status -> Nullable<SmallInt>,
        comment -> Text,
        update_type -> SmallInt,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attachments (id) {
        id -> Uuid,
        issue_id -> Nullable<Uuid>,
        comment_id -> Nullable<Uuid>,
        filename -> Varchar,
        mimetype -> Varchar,
        data -> Bytea,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(citizens -> users (user_id));
diesel::joinable!(issues -> citizens (citizen_id));
diesel::joinable!(issues -> issue_categories (category_id));
diesel::joinable!(issue_updates -> issues (issue_id));
diesel::joinable!(issue_updates -> users (author_id));
diesel::joinable!(attachments -> issues (issue_id));
diesel::joinable!(attachments -> issue_updates (comment_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    citizens,
    issue_categories,
    issues,
    issue_updates,
    attachments,
);
