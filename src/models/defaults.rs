//! Built-in department records, the base layer of every resolution pass.

use super::{DepartmentMapping, DepartmentRecord, PUBLIC_CODE};

pub const DEFAULT_EVENT_NAME: &str = "DOTTECH";
pub const DEFAULT_TAGLINE: &str = "INNOVATE • DOMINATE • ELEVATE";
pub const DEFAULT_DATE: &str = "JANUARY 30-31, 2026";
pub const DEFAULT_TIME: &str = "07:00 AM - 6:00 PM";
pub const DEFAULT_VENUE: &str = "MAIN AUDITORIUM NEXUS";

pub const DEFAULT_HIGHLIGHTS: [&str; 6] = [
    "HACK A MIN",
    "UNLOCK VERSE",
    "VIRTUAL STOCK MARKET",
    "CODE EVOLUTION",
    "QR TECH HUNT",
    "LAN GAMING",
];

pub const INVITATION_LETTER: &str = "Dear Esteemed Participant,

We are honored to extend this exclusive invitation to you for DOTTECH 2026, the flagship technological symposium that brings together the brightest minds in innovation and engineering.

This prestigious event will showcase cutting-edge developments in artificial intelligence, robotics, quantum computing, and next-generation technologies. Join us for an immersive experience featuring expert-led workshops, competitive hackathons, industry insights, and unparalleled networking opportunities.

Your participation will contribute to shaping the future of technology and fostering collaborative innovation across disciplines. We look forward to welcoming you to this transformative gathering of visionaries and pioneers.

Mark your calendars and prepare to be part of technological excellence.

Warm Regards,
DOTTECH Organizing Committee";

fn builtin(code: &str, name: &str, tagline: &str, venue: &str) -> DepartmentRecord {
    DepartmentRecord {
        code: code.to_string(),
        name: name.to_string(),
        event_name: DEFAULT_EVENT_NAME.to_string(),
        tagline: tagline.to_string(),
        date: DEFAULT_DATE.to_string(),
        time: DEFAULT_TIME.to_string(),
        venue: venue.to_string(),
        message: INVITATION_LETTER.to_string(),
        highlights: DEFAULT_HIGHLIGHTS.iter().map(|h| h.to_string()).collect(),
        saved_at: None,
        version: 0,
    }
}

/// The four compiled-in departments, PUBLIC included.
pub fn default_departments() -> DepartmentMapping {
    [
        builtin(
            "BSCCSIT",
            "BSc COMPUTER SCIENCE & IT",
            "CODE • INNOVATE • TRANSFORM",
            "BSc CS/IT COMPUTER LAB",
        ),
        builtin(
            "BMS",
            "BACHELOR OF MANAGEMENT STUDIES",
            "LEAD • MANAGE • SUCCEED",
            "BMS SEMINAR HALL",
        ),
        builtin(
            "BBA",
            "BACHELOR OF BUSINESS ADMINISTRATION",
            "STRATEGIZE • EXECUTE • EXCEL",
            "BBA CONFERENCE ROOM",
        ),
        default_public(),
    ]
    .into_iter()
    .map(|record| (record.code.clone(), record))
    .collect()
}

/// The built-in PUBLIC record, available even when every other tier is empty.
pub fn default_public() -> DepartmentRecord {
    builtin(
        PUBLIC_CODE,
        "PUBLIC INVITATION",
        DEFAULT_TAGLINE,
        DEFAULT_VENUE,
    )
}
