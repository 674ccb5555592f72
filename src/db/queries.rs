use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::{Appointment, AppointmentStatus, BookedInterval, Professional, Service};
use crate::services::timeutil;

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price, description, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.id,
            service.name,
            service.duration_minutes,
            service.price,
            service.description,
            service.is_active,
        ],
    )?;
    Ok(())
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, duration_minutes = ?2, price = ?3, description = ?4, is_active = ?5
         WHERE id = ?6",
        params![
            service.name,
            service.duration_minutes,
            service.price,
            service.description,
            service.is_active,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, duration_minutes, price, description, is_active
         FROM services WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id], parse_service_row);
    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_services(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Service>> {
    let sql = if active_only {
        "SELECT id, name, duration_minutes, price, description, is_active
         FROM services WHERE is_active = 1 ORDER BY name ASC"
    } else {
        "SELECT id, name, duration_minutes, price, description, is_active
         FROM services ORDER BY name ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

fn parse_service_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        duration_minutes: row.get(2)?,
        price: row.get(3)?,
        description: row.get(4)?,
        is_active: row.get(5)?,
    })
}

// ── Professionals ──

pub fn create_professional(conn: &Connection, professional: &Professional) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO professionals (id, name, specialty, photo_url, service_ids, work_days,
                                    work_hours_start, work_hours_end, is_active, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            professional.id,
            professional.name,
            professional.specialty,
            professional.photo_url,
            serde_json::to_string(&professional.service_ids)?,
            serde_json::to_string(&professional.work_days)?,
            professional.work_hours_start,
            professional.work_hours_end,
            professional.is_active,
            professional.description,
        ],
    )?;
    Ok(())
}

pub fn update_professional(conn: &Connection, professional: &Professional) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE professionals SET name = ?1, specialty = ?2, photo_url = ?3, service_ids = ?4,
                work_days = ?5, work_hours_start = ?6, work_hours_end = ?7, is_active = ?8,
                description = ?9
         WHERE id = ?10",
        params![
            professional.name,
            professional.specialty,
            professional.photo_url,
            serde_json::to_string(&professional.service_ids)?,
            serde_json::to_string(&professional.work_days)?,
            professional.work_hours_start,
            professional.work_hours_end,
            professional.is_active,
            professional.description,
            professional.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_professional(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM professionals WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_professional(conn: &Connection, id: &str) -> anyhow::Result<Option<Professional>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, specialty, photo_url, service_ids, work_days,
                work_hours_start, work_hours_end, is_active, description
         FROM professionals WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id], |row| Ok(parse_professional_row(row)));
    match result {
        Ok(professional) => Ok(Some(professional?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_professionals(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Professional>> {
    let sql = if active_only {
        "SELECT id, name, specialty, photo_url, service_ids, work_days,
                work_hours_start, work_hours_end, is_active, description
         FROM professionals WHERE is_active = 1 ORDER BY name ASC"
    } else {
        "SELECT id, name, specialty, photo_url, service_ids, work_days,
                work_hours_start, work_hours_end, is_active, description
         FROM professionals ORDER BY name ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_professional_row(row)))?;

    let mut professionals = vec![];
    for row in rows {
        professionals.push(row??);
    }
    Ok(professionals)
}

fn parse_professional_row(row: &Row<'_>) -> anyhow::Result<Professional> {
    let service_ids_json: String = row.get(4)?;
    let work_days_json: String = row.get(5)?;
    Ok(Professional {
        id: row.get(0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        photo_url: row.get(3)?,
        service_ids: serde_json::from_str(&service_ids_json).unwrap_or_default(),
        work_days: serde_json::from_str(&work_days_json).unwrap_or_default(),
        work_hours_start: row.get(6)?,
        work_hours_end: row.get(7)?,
        is_active: row.get(8)?,
        description: row.get(9)?,
    })
}

// ── Appointments ──

pub fn create_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, client_id, client_name, client_phone, professional_id,
                                   service_id, date, time, timestamp_utc, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appointment.id,
            appointment.client_id,
            appointment.client_name,
            appointment.client_phone,
            appointment.professional_id,
            appointment.service_id,
            appointment.date.format("%Y-%m-%d").to_string(),
            appointment.time.format("%H:%M").to_string(),
            appointment.timestamp_utc.to_rfc3339(),
            appointment.status.as_str(),
            appointment.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Whether an error from [`create_appointment`] is the slot uniqueness
/// index firing, meaning someone else took the slot first.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, client_name, client_phone, professional_id, service_id,
                date, time, timestamp_utc, status, created_at
         FROM appointments WHERE id = ?1",
    )?;
    let result = stmt.query_row(params![id], |row| Ok(parse_appointment_row(row)));
    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            "SELECT id, client_id, client_name, client_phone, professional_id, service_id,
                    date, time, timestamp_utc, status, created_at
             FROM appointments WHERE status = ?1 ORDER BY date DESC, time DESC LIMIT ?2"
                .to_string(),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            "SELECT id, client_id, client_name, client_phone, professional_id, service_id,
                    date, time, timestamp_utc, status, created_at
             FROM appointments ORDER BY date DESC, time DESC LIMIT ?1"
                .to_string(),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Taken intervals for one professional on one date, excluding cancelled
/// records. Duration comes from the booked service.
pub fn get_booked_intervals(
    conn: &Connection,
    professional_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<BookedInterval>> {
    let mut stmt = conn.prepare(
        "SELECT a.time, s.duration_minutes
         FROM appointments a JOIN services s ON s.id = a.service_id
         WHERE a.professional_id = ?1 AND a.date = ?2 AND a.status != 'cancelled'
         ORDER BY a.time ASC",
    )?;
    let date_str = date.format("%Y-%m-%d").to_string();
    let rows = stmt.query_map(params![professional_id, date_str], |row| {
        let time_str: String = row.get(0)?;
        let duration: i64 = row.get(1)?;
        Ok((time_str, duration))
    })?;

    let mut intervals = vec![];
    for row in rows {
        let (time_str, duration_minutes) = row?;
        intervals.push(BookedInterval {
            start: timeutil::parse_time(&time_str)?,
            duration_minutes,
        });
    }
    Ok(intervals)
}

/// Set an appointment cancelled. Terminal and idempotent: cancelling an
/// already cancelled record is a no-op that still reports the record found.
pub fn cancel_appointment(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM appointments WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(false);
    }
    conn.execute(
        "UPDATE appointments SET status = 'cancelled' WHERE id = ?1 AND status != 'cancelled'",
        params![id],
    )?;
    Ok(true)
}

fn parse_appointment_row(row: &Row<'_>) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(6)?;
    let time_str: String = row.get(7)?;
    let timestamp_str: String = row.get(8)?;
    let status_str: String = row.get(9)?;
    let created_str: String = row.get(10)?;

    Ok(Appointment {
        id: row.get(0)?,
        client_id: row.get(1)?,
        client_name: row.get(2)?,
        client_phone: row.get(3)?,
        professional_id: row.get(4)?,
        service_id: row.get(5)?,
        date: timeutil::parse_date(&date_str)?,
        time: timeutil::parse_time(&time_str)?,
        timestamp_utc: DateTime::parse_from_rfc3339(&timestamp_str)?.with_timezone(&Utc),
        status: AppointmentStatus::parse(&status_str),
        created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
    })
}

// ── Store configuration ──

pub fn load_config_blob(conn: &Connection) -> anyhow::Result<Option<serde_json::Value>> {
    let result = conn.query_row(
        "SELECT data FROM store_config WHERE id = 1",
        [],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_config_blob(conn: &Connection, blob: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO store_config (id, data) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        params![serde_json::to_string(blob)?],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::StoreConfig;
    use chrono::{NaiveTime, TimeZone};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn service(id: &str) -> Service {
        Service {
            id: id.to_string(),
            name: "Corte".to_string(),
            duration_minutes: 60,
            price: 80.0,
            description: None,
            is_active: true,
        }
    }

    fn professional(id: &str) -> Professional {
        Professional {
            id: id.to_string(),
            name: "Ana Souza".to_string(),
            specialty: "Cabeleireira".to_string(),
            photo_url: String::new(),
            service_ids: vec!["svc-1".to_string()],
            work_days: vec![1, 2, 3, 4, 5],
            work_hours_start: "09:00".to_string(),
            work_hours_end: "18:00".to_string(),
            is_active: true,
            description: None,
        }
    }

    fn appointment(id: &str, time: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            client_id: "guest".to_string(),
            client_name: "Maria".to_string(),
            client_phone: "5511988887777".to_string(),
            professional_id: "pro-1".to_string(),
            service_id: "svc-1".to_string(),
            date: timeutil::parse_date("2025-06-17").unwrap(),
            time: timeutil::parse_time(time).unwrap(),
            timestamp_utc: Utc.with_ymd_and_hms(2025, 6, 17, 13, 0, 0).unwrap(),
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    fn seed(conn: &Connection) {
        create_service(conn, &service("svc-1")).unwrap();
        create_professional(conn, &professional("pro-1")).unwrap();
    }

    #[test]
    fn test_service_crud() {
        let conn = setup_db();
        let mut svc = service("svc-1");
        create_service(&conn, &svc).unwrap();

        svc.price = 95.0;
        svc.is_active = false;
        assert!(update_service(&conn, &svc).unwrap());

        let loaded = get_service(&conn, "svc-1").unwrap().unwrap();
        assert_eq!(loaded.price, 95.0);
        assert!(!loaded.is_active);

        assert!(list_services(&conn, true).unwrap().is_empty());
        assert_eq!(list_services(&conn, false).unwrap().len(), 1);

        assert!(delete_service(&conn, "svc-1").unwrap());
        assert!(get_service(&conn, "svc-1").unwrap().is_none());
    }

    #[test]
    fn test_professional_round_trip() {
        let conn = setup_db();
        create_professional(&conn, &professional("pro-1")).unwrap();
        let loaded = get_professional(&conn, "pro-1").unwrap().unwrap();
        assert_eq!(loaded.service_ids, vec!["svc-1".to_string()]);
        assert_eq!(loaded.work_days, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_appointment_round_trip() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        let loaded = get_appointment(&conn, "apt-1").unwrap().unwrap();
        assert_eq!(loaded.time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(loaded.status, AppointmentStatus::Confirmed);
        assert_eq!(
            loaded.timestamp_utc,
            Utc.with_ymd_and_hms(2025, 6, 17, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_double_booking_hits_unique_index() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        let err = create_appointment(&conn, &appointment("apt-2", "10:00")).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_cancelled_slot_reopens() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        assert!(cancel_appointment(&conn, "apt-1").unwrap());
        // The partial index only covers live records
        create_appointment(&conn, &appointment("apt-2", "10:00")).unwrap();
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        assert!(cancel_appointment(&conn, "apt-1").unwrap());
        assert!(cancel_appointment(&conn, "apt-1").unwrap());
        let loaded = get_appointment(&conn, "apt-1").unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_cancel_missing_appointment() {
        let conn = setup_db();
        assert!(!cancel_appointment(&conn, "nope").unwrap());
    }

    #[test]
    fn test_booked_intervals_exclude_cancelled() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        create_appointment(&conn, &appointment("apt-2", "11:00")).unwrap();
        cancel_appointment(&conn, "apt-1").unwrap();

        let intervals = get_booked_intervals(
            &conn,
            "pro-1",
            timeutil::parse_date("2025-06-17").unwrap(),
        )
        .unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
        assert_eq!(intervals[0].duration_minutes, 60);
    }

    #[test]
    fn test_list_appointments_status_filter() {
        let conn = setup_db();
        seed(&conn);
        create_appointment(&conn, &appointment("apt-1", "10:00")).unwrap();
        create_appointment(&conn, &appointment("apt-2", "11:00")).unwrap();
        cancel_appointment(&conn, "apt-2").unwrap();

        let confirmed = list_appointments(&conn, Some("confirmed"), 50).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "apt-1");

        let all = list_appointments(&conn, None, 50).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_config_blob_round_trip() {
        let conn = setup_db();
        assert!(load_config_blob(&conn).unwrap().is_none());

        let config = StoreConfig::default();
        save_config_blob(&conn, &serde_json::to_value(&config).unwrap()).unwrap();

        let blob = load_config_blob(&conn).unwrap().unwrap();
        let loaded = StoreConfig::from_partial(&blob);
        assert_eq!(loaded.name, config.name);

        // Upsert replaces the singleton
        let mut updated = serde_json::to_value(&config).unwrap();
        updated["name"] = serde_json::json!("Espaço Glamour");
        save_config_blob(&conn, &updated).unwrap();
        let blob = load_config_blob(&conn).unwrap().unwrap();
        assert_eq!(blob["name"], "Espaço Glamour");
    }
}
