//! Category rules for the social-network export.
//!
//! The category → (document path, record-array key) table and every title
//! string are compatibility surface with real export archives; wording is
//! reproduced verbatim, quirks included.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::{
    load_category, req_str, req_time, run_direct, run_grouped, run_keyed_dispatch,
    run_labeled_dispatch, DirectRule, GroupedRule, KeyedDispatchRule, LabeledDispatchRule,
    LabeledOption, MetadataSpec, TitleSpec,
};
use crate::archive::{SocialAdapter, SourceAdapter};
use crate::directory::{EntityDirectory, MentionPolicy};
use crate::error::{Result, SourceError};
use crate::event::Event;

/// Friend-list categories. These both emit events and populate the entity
/// directory, which is why they run before everything else.
struct FriendCategory {
    path: &'static str,
    node: &'static str,
    key: &'static str,
    title_prefix: &'static str,
}

const FRIEND_CATEGORIES: [FriendCategory; 4] = [
    FriendCategory {
        path: "friends_and_followers/friend_requests_sent.json",
        node: "sent_requests_v2",
        key: "friend_request_sent",
        title_prefix: "You sent a friend request to: ",
    },
    FriendCategory {
        path: "friends_and_followers/friends.json",
        node: "friends_v2",
        key: "friend_added",
        title_prefix: "You became friends with: ",
    },
    FriendCategory {
        path: "friends_and_followers/rejected_friend_requests.json",
        node: "rejected_requests_v2",
        key: "rejected_friend_request",
        title_prefix: "You rejected a friend request from: ",
    },
    FriendCategory {
        path: "friends_and_followers/removed_friends.json",
        node: "deleted_friends_v2",
        key: "friend_removed",
        title_prefix: "You unfriended a friend: ",
    },
];

const DIRECT_RULES: [DirectRule; 17] = [
    DirectRule {
        source: "Ads",
        key: "ad_interaction",
        path: "ads_information/advertisers_you've_interacted_with.json",
        node: "history_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Prefixed {
            prefix: "You interacted with an advertiser on Facebook: ",
            field: "title",
        },
        metadata: MetadataSpec::None,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Apps and Websites",
        key: "installed_app",
        path: "apps_and_websites_off_of_facebook/apps_and_websites.json",
        node: "installed_apps_v2",
        timestamp_field: "added_timestamp",
        title: TitleSpec::Prefixed {
            prefix: "You connected an app to Facebook: ",
            field: "name",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Comments and Reactions",
        key: "comment_added",
        path: "comments_and_reactions/comments.json",
        node: "comments_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::Field {
            field: "data",
            required: true,
        },
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Comments and Reactions",
        key: "reaction_added",
        path: "comments_and_reactions/posts_and_comments.json",
        node: "reactions_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::Field {
            field: "data",
            required: true,
        },
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Events",
        key: "event_started",
        path: "events/event_invitations.json",
        node: "events_invited",
        timestamp_field: "start_timestamp",
        title: TitleSpec::Prefixed {
            prefix: "An event that you were invited to began: ",
            field: "name",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Groups",
        key: "group_comment",
        path: "groups/your_comments_in_groups.json",
        node: "group_comments_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::Field {
            field: "data",
            required: false,
        },
        content_field: None,
        location_field: None,
        mentions: true,
    },
    DirectRule {
        source: "Groups",
        key: "group_joined",
        path: "groups/your_group_membership_activity.json",
        node: "groups_joined_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::None,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Groups",
        key: "group_post",
        path: "groups/your_posts_in_groups.json",
        node: "group_posts_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::Field {
            field: "data",
            required: true,
        },
        content_field: None,
        location_field: None,
        mentions: true,
    },
    DirectRule {
        source: "Location",
        key: "location_logged",
        path: "location/location_history.json",
        node: "location_history_v2",
        timestamp_field: "creation_timestamp",
        title: TitleSpec::Build(location_title),
        metadata: MetadataSpec::None,
        content_field: None,
        location_field: Some("coordinate"),
        mentions: false,
    },
    DirectRule {
        source: "Notifications",
        key: "notification_sent",
        path: "notifications/notifications.json",
        node: "notifications_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Prefixed {
            prefix: "Facebook sent you a notification: ",
            field: "text",
        },
        metadata: MetadataSpec::None,
        content_field: Some("href"),
        location_field: None,
        mentions: true,
    },
    DirectRule {
        source: "Polls",
        key: "poll_vote",
        path: "polls/polls_you_voted_on.json",
        node: "poll_votes_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Field("title"),
        metadata: MetadataSpec::Field {
            field: "attachments",
            required: false,
        },
        content_field: None,
        location_field: None,
        mentions: true,
    },
    DirectRule {
        source: "Search",
        key: "search",
        path: "search/your_search_history.json",
        node: "searches_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Build(search_title),
        metadata: MetadataSpec::Field {
            field: "attachments",
            required: false,
        },
        content_field: None,
        location_field: None,
        mentions: true,
    },
    DirectRule {
        source: "Security and Login",
        key: "account_event",
        path: "security_and_login_information/account_activity.json",
        node: "account_activity_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Build(account_activity_title),
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Security and Login",
        key: "account_event",
        path: "security_and_login_information/authorized_logins.json",
        node: "recognized_devices_v2",
        timestamp_field: "created_timestamp",
        title: TitleSpec::Prefixed {
            prefix: "Signed into Facebook from a new device: ",
            field: "name",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Security and Login",
        key: "account_event",
        path: "security_and_login_information/ip_address_activity.json",
        node: "used_ip_address_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Prefixed {
            prefix: "IP Address Activity Record: ",
            field: "action",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Security and Login",
        key: "account_event",
        path: "security_and_login_information/logins_and_logouts.json",
        node: "account_accesses_v2",
        timestamp_field: "timestamp",
        title: TitleSpec::Prefixed {
            prefix: "Login/Logout Event: ",
            field: "action",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
    DirectRule {
        source: "Security and Login",
        key: "account_event",
        path: "security_and_login_information/where_you're_logged_in.json",
        node: "active_sessions_v2",
        timestamp_field: "created_timestamp",
        title: TitleSpec::Prefixed {
            prefix: "Active Session near: ",
            field: "location",
        },
        metadata: MetadataSpec::Record,
        content_field: None,
        location_field: None,
        mentions: false,
    },
];

const LABELED_RULES: [LabeledDispatchRule; 2] = [
    LabeledDispatchRule {
        source: "About You",
        path: "about_you/preferences.json",
        node: "preferences",
        options: &[
            LabeledOption {
                label: "Favorites",
                key: "prioritized_page",
                title_prefix: "You prioritized a page in your news feed: ",
            },
            LabeledOption {
                label: "Messenger Contacts You've Blocked",
                key: "blocked_contact",
                title_prefix: "You blocked a Messenger contact: ",
            },
            // The trailing space in the label is present in real archives.
            LabeledOption {
                label: "Language ",
                key: "dismissed_chat_notification",
                title_prefix: "You dismissed a chat notification from a page: ",
            },
        ],
    },
    LabeledDispatchRule {
        source: "About You",
        path: "about_you/visited.json",
        node: "visited_things",
        options: &[
            LabeledOption {
                label: "Profile visits",
                key: "profile_visit",
                title_prefix: "You visited a profile: ",
            },
            LabeledOption {
                label: "Page visits",
                key: "page_visit",
                title_prefix: "You visited a page: ",
            },
            LabeledOption {
                label: "Events visited",
                key: "event_visit",
                title_prefix: "You visited an event page: ",
            },
            LabeledOption {
                label: "Groups visited",
                key: "group_visit",
                title_prefix: "You visited a group: ",
            },
        ],
    },
];

const EVENT_RESPONSES: KeyedDispatchRule = KeyedDispatchRule {
    source: "Events",
    key: "event_started",
    path: "events/your_event_responses.json",
    node: "event_responses_v2",
    timestamp_field: "start_timestamp",
    options: &[
        ("events_joined", "You RSVP'd to an event: "),
        ("events_declined", "An event you declined began: "),
        ("events_interested", "An event you were interested in began: "),
    ],
};

const OFF_FACEBOOK_ACTIVITY: GroupedRule = GroupedRule {
    source: "Apps and Websites Off of Facebook",
    key: "off_facebook_activity_record",
    path: "apps_and_websites_off_of_facebook/your_off-facebook_activity.json",
    node: "off_facebook_activity_v2",
    inner_key: "events",
    title: off_facebook_title,
};

fn location_title(row: &Value) -> Result<String> {
    Ok(format!(
        "Facebook recorded your location in {}.",
        req_str(row, "location_history_v2", "name")?
    ))
}

fn search_title(row: &Value) -> Result<String> {
    let text = row
        .get("data")
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
        .and_then(|first| first.get("text"))
        .and_then(Value::as_str)
        .unwrap_or("[unknown]");
    Ok(format!("You searched Facebook for: {text}"))
}

fn account_activity_title(row: &Value) -> Result<String> {
    Ok(format!(
        "Facebook Account Event: {} near {}",
        req_str(row, "account_activity_v2", "action")?,
        req_str(row, "account_activity_v2", "city")?
    ))
}

fn off_facebook_title(group_name: &str, inner: &Value) -> Result<String> {
    Ok(format!(
        "Facebook logged off-Facebook activity on: {group_name} (type: {})",
        req_str(inner, "off_facebook_activity_v2", "type")?
    ))
}

/// Extract everything the social archive holds. Builds the entity
/// directory from the friend lists first; that ordering is a precondition
/// for every rule with mention resolution, not a side effect of call order.
pub fn extract_social(adapter: &SocialAdapter, identity: Option<&str>) -> Result<Vec<Event>> {
    let (directory, mut events) = build_directory(adapter)?;
    info!(
        company = adapter.company(),
        directory = directory.len(),
        "entity directory built"
    );

    for rule in &DIRECT_RULES {
        run_direct(adapter, rule, &directory, &mut events)?;
    }
    for rule in &LABELED_RULES {
        run_labeled_dispatch(adapter, rule, &directory, &mut events)?;
    }
    run_keyed_dispatch(adapter, &EVENT_RESPONSES, &mut events)?;
    run_grouped(adapter, &OFF_FACEBOOK_ACTIVITY, &mut events)?;
    extract_threads(adapter, identity, &mut events)?;

    info!(
        company = adapter.company(),
        events = events.len(),
        "social extraction complete"
    );
    Ok(events)
}

/// Friend lists populate the directory and emit events in one pass.
pub fn build_directory(adapter: &SocialAdapter) -> Result<(EntityDirectory, Vec<Event>)> {
    let mut directory = EntityDirectory::new(MentionPolicy::FirstToken);
    let mut events = Vec::new();
    for cat in &FRIEND_CATEGORIES {
        for row in load_category(adapter, cat.path, cat.node)? {
            let name = req_str(&row, cat.node, "name")?.to_string();
            let ts = req_time(&row, cat.node, "timestamp")?;
            directory.insert(name.clone(), None);
            let ev = Event::new(
                adapter.company(),
                "Friends",
                cat.key,
                ts,
                format!("{}{name}", cat.title_prefix),
                cat.node,
            )?
            .names(BTreeSet::from([name]));
            events.push(ev);
        }
    }
    Ok((directory, events))
}

/// Conversation threads are whole documents, not flat record arrays: one
/// `message_1.json` per thread, discovered by enumeration.
fn extract_threads(
    adapter: &SocialAdapter,
    identity: Option<&str>,
    events: &mut Vec<Event>,
) -> Result<()> {
    for locator in adapter.enumerate(".json") {
        if !locator.to_string_lossy().ends_with("message_1.json") {
            continue;
        }
        debug!(thread = %locator.display(), "reading conversation thread");
        let thread = adapter.read_raw(&locator)?;

        let participants: Vec<String> = thread
            .get("participants")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::malformed("messages", "participants"))?
            .iter()
            .map(|row| req_str(row, "participants", "name").map(str::to_string))
            .collect::<Result<_>>()?;
        let messages = thread
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::malformed("messages", "messages"))?;
        let group_name = thread
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("[unnamed thread]");
        let thread_details: Map<String, Value> = thread
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(k, _)| k.as_str() != "messages")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for message in messages {
            let n = participants.len();
            if n < 1 {
                let err = SourceError::ThreadWithoutParticipants(locator.display().to_string());
                warn!(%err, "skipping message");
                continue;
            }

            let sender = message.get("sender_name").and_then(Value::as_str);
            let is_sender = identity.is_some() && sender == identity;
            let body = message.get("content").and_then(Value::as_str);
            let rendered_body = body.unwrap_or("[empty body]");

            let title = if n == 1 {
                format!("You sent a message to yourself: {rendered_body}")
            } else if n == 2 {
                let other = participants
                    .iter()
                    .find(|p| Some(p.as_str()) != identity)
                    .ok_or_else(|| SourceError::malformed("messages", "participants"))?;
                if is_sender {
                    format!("You sent a DM to {other}: {rendered_body}")
                } else {
                    format!("You received a DM from {other}: {rendered_body}")
                }
            } else if is_sender {
                format!("You sent a message to in the group \"{group_name}\": {rendered_body}")
            } else {
                format!("You received a message in the group \"{group_name}\": {rendered_body}")
            };

            let ts_ms = message
                .get("timestamp_ms")
                .and_then(Value::as_f64)
                .ok_or_else(|| SourceError::malformed("messages", "timestamp_ms"))?;

            let ev = Event::new(
                adapter.company(),
                "Messenger",
                "messenger_event",
                ts_ms / 1000.0,
                title,
                "messages",
            )?
            .maybe_content(body.map(str::to_string))
            .metadata(json!({
                "thread_details": thread_details,
                "message_details": message,
            }));
            events.push(ev);
        }
    }
    Ok(())
}
