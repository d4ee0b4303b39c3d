diesel::table! {
    users (id) {
        id -> Varchar,
        email -> Nullable<Varchar>,
        name -> Varchar,
        image -> Nullable<Varchar>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    listings (id) {
        id -> Uuid,
        owner_id -> Varchar,
        title -> Varchar,
        platform -> Varchar,
        username -> Varchar,
        price -> Numeric,
        description -> Text,
        images -> Jsonb,
        followers_count -> Int8,
        engagement_rate -> Float8,
        monthly_views -> Int8,
        niche -> Varchar,
        country -> Varchar,
        age_range -> Varchar,
        platform_assured -> Bool,
        monetized -> Bool,
        verified -> Bool,
        status -> Varchar,
        is_credential_changed -> Bool,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    chats (id) {
        id -> Uuid,
        listing_id -> Uuid,
        owner_user_id -> Varchar,
        chat_user_id -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Uuid,
        chat_id -> Uuid,
        sender_id -> Varchar,
        message -> Text,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    transactions (id) {
        id -> Uuid,
        user_id -> Varchar,
        listing_id -> Uuid,
        amount -> Numeric,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    credentials (id) {
        id -> Uuid,
        listing_id -> Uuid,
        fields -> Jsonb,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(listings -> users (owner_id));
diesel::joinable!(chat_messages -> chats (chat_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    listings,
    chats,
    chat_messages,
    transactions,
    credentials,
);
