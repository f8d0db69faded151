diesel::table! {
    audit_logs (id) {
        id -> Integer,
        timestamp -> Timestamp,
        user -> Text,
        category -> Text,
        description -> Text,
        status -> Text,
    }
}

diesel::table! {
    loans (id) {
        id -> Integer,
        member_id -> Integer,
        principal -> Double,
        interest_rate -> Double,
        duration_months -> Integer,
        status -> Text,
        date_issued -> Date,
        due_date -> Date,
        created_at -> Timestamp,
    }
}

diesel::table! {
    members (id) {
        id -> Integer,
        staff_number -> Text,
        full_name -> Text,
        date_joined -> Date,
        current_savings -> Double,
        total_loans -> Double,
        created_at -> Timestamp,
        phone -> Text,
        bank_name -> Text,
        account_no -> Text,
        department -> Text,
    }
}

diesel::table! {
    savings_transactions (id) {
        id -> Integer,
        member_id -> Integer,
        trans_date -> Date,
        trans_type -> Text,
        amount -> Double,
        running_balance -> Double,
        created_at -> Timestamp,
    }
}

diesel::table! {
    system_settings (id) {
        id -> Integer,
        society_name -> Text,
        street -> Text,
        city_state -> Text,
        phone -> Text,
        email -> Text,
        reg_no -> Text,
        loan_multiplier -> Double,
        default_interest_rate -> Double,
        default_duration -> Integer,
        updated_at -> Timestamp,
        security_mode -> Text,
        auth_hash -> Nullable<Text>,
        timeout_minutes -> Integer,
        theme -> Text,
        text_scale -> Double,
        show_charts -> Bool,
        show_alerts -> Bool,
        setup_completed -> Bool,
    }
}

diesel::joinable!(loans -> members (member_id));
diesel::joinable!(savings_transactions -> members (member_id));

diesel::allow_tables_to_appear_in_same_query!(
    audit_logs,
    loans,
    members,
    savings_transactions,
    system_settings,
);
