use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{
    GeneticRisk, Patient, PatientId, PollutionLevel, Prediction, SmokingHistory,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// A validated patient record that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub age: i64,
    pub smoking_history: SmokingHistory,
    pub pollution_level: PollutionLevel,
    pub genetic_risk: GeneticRisk,
    pub assessment: Prediction,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` opens its own empty database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_patient(&self, patient: &NewPatient) -> Result<Patient> {
        let row = sqlx::query(
            "INSERT INTO patients
                (age, smoking_history, pollution_level, genetic_risk, risk_level, recommendation)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, age, smoking_history, pollution_level, genetic_risk, risk_level, recommendation",
        )
        .bind(patient.age)
        .bind(patient.smoking_history.as_str())
        .bind(patient.pollution_level.as_str())
        .bind(patient.genetic_risk.as_str())
        .bind(&patient.assessment.risk_level)
        .bind(&patient.assessment.recommendation)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert patient")?;
        patient_from_row(&row)
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        let rows = sqlx::query(
            "SELECT id, age, smoking_history, pollution_level, genetic_risk, risk_level, recommendation
             FROM patients
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list patients")?;
        rows.iter().map(patient_from_row).collect()
    }

    /// Returns `false` when no row with that id existed.
    pub async fn delete_patient(&self, patient_id: PatientId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(patient_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete patient {patient_id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn patient_from_row(row: &SqliteRow) -> Result<Patient> {
    Ok(Patient {
        id: PatientId(row.try_get("id")?),
        age: row.try_get("age")?,
        smoking_history: row.try_get("smoking_history")?,
        pollution_level: row.try_get("pollution_level")?,
        genetic_risk: row.try_get("genetic_risk")?,
        risk_level: row.try_get("risk_level")?,
        recommendation: row.try_get("recommendation")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
