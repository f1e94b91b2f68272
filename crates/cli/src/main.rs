use clap::{Parser, Subcommand};
use hms_core::{
    constants::{DEFAULT_DATA_DIR, DEFAULT_EVENT_BUFFER},
    AllocationOutcome, Condition, CoreConfig, FileStore, HospitalService, NewPatient, NewRoom,
    Patient, PatientId, PatientQuery, PatientStatus, RecordingSink, Room, RoomId, RoomQuery,
    RoomStatus, RoomType, StoreBackend,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hms")]
#[command(about = "Hospital room allocation CLI")]
struct Cli {
    /// Data directory of the file store
    #[arg(long, env = "HMS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Do not auto-allocate when admitting patients
    #[arg(long)]
    no_auto_allocate: bool,
    /// Print the events each command emits
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List patients
    ListPatients {
        /// Only patients waiting for a room, in allocation order
        #[arg(long)]
        waiting: bool,
    },
    /// List rooms
    ListRooms {
        /// Only rooms that can take a patient now
        #[arg(long)]
        available: bool,
    },
    /// Register a room
    AddRoom {
        /// Room number, e.g. ICU-1
        room_number: String,
        /// ICU, General, Private, Emergency or Surgery
        room_type: RoomType,
        floor: i32,
        #[arg(long, default_value_t = 1)]
        capacity: u32,
        /// Amenity (repeatable)
        #[arg(long = "amenity")]
        amenities: Vec<String>,
    },
    /// Admit a patient
    Admit {
        name: String,
        age: u32,
        /// Critical, Stable or Normal
        condition: Condition,
        /// Queue as Pending instead of Admitted (no auto-allocation)
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Assign a patient to a room
    Assign {
        patient_id: PatientId,
        room_id: RoomId,
    },
    /// Discharge a patient and send their room to cleaning
    Release { patient_id: PatientId },
    /// Allocate a room to the most urgent waiting patient
    AutoAllocate,
    /// Show patients whose room type does not match their condition
    Suggestions,
    /// Change the status of an unoccupied room
    SetRoomStatus {
        room_id: RoomId,
        /// Available, Maintenance or Cleaning
        status: RoomStatus,
    },
    /// Show the ward overview
    Summary,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'hms --help' for commands");
        return Ok(());
    };

    let cfg = Arc::new(CoreConfig::new(
        cli.data_dir.clone(),
        StoreBackend::File,
        DEFAULT_EVENT_BUFFER,
        !cli.no_auto_allocate,
    )?);
    let store = Arc::new(FileStore::open(cli.data_dir)?);
    let events = Arc::new(RecordingSink::new());
    let service = HospitalService::new(cfg, store, events.clone());

    let result = run(&service, command);

    if cli.verbose {
        for event in events.take() {
            match event.to_json() {
                Ok(json) => println!("event: {}", json),
                Err(e) => eprintln!("Error serialising event: {}", e),
            }
        }
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run(service: &HospitalService, command: Commands) -> hms_core::HospitalResult<()> {
    match command {
        Commands::ListPatients { waiting } => {
            let patients = if waiting {
                service.waiting_patients()?
            } else {
                service.list_patients(&PatientQuery::default())?
            };
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in &patients {
                print_patient(patient);
            }
        }
        Commands::ListRooms { available } => {
            let query = if available {
                RoomQuery::available(None)
            } else {
                RoomQuery::default()
            };
            let rooms = service.list_rooms(&query)?;
            if rooms.is_empty() {
                println!("No rooms found.");
            }
            for room in &rooms {
                print_room(room);
            }
        }
        Commands::AddRoom {
            room_number,
            room_type,
            floor,
            capacity,
            amenities,
        } => {
            let room = service.create_room(NewRoom {
                room_number,
                room_type,
                floor,
                capacity,
                amenities,
                status: None,
            })?;
            println!("Created room {} with ID: {}", room.room_number, room.id);
        }
        Commands::Admit {
            name,
            age,
            condition,
            pending,
            notes,
        } => {
            let admission = service.admit_patient(NewPatient {
                name,
                age,
                condition,
                status: pending.then_some(PatientStatus::Pending),
                admission_date: None,
                notes,
            })?;
            println!("Admitted patient with ID: {}", admission.patient.id);
            if let Some(outcome) = &admission.allocation {
                print_outcome(outcome);
            }
        }
        Commands::Assign {
            patient_id,
            room_id,
        } => {
            let assignment = service.assign_room(&patient_id, &room_id)?;
            println!(
                "Assigned {} to room {}",
                assignment.patient.name, assignment.room.room_number
            );
            if let Some(vacated) = &assignment.vacated_room {
                println!("Room {} is now {}", vacated.room_number, vacated.status);
            }
        }
        Commands::Release { patient_id } => {
            let released = service.release_room(&patient_id)?;
            println!(
                "Discharged {}; room {} is now {}",
                released.patient.name, released.room.room_number, released.room.status
            );
        }
        Commands::AutoAllocate => print_outcome(&service.auto_allocate()?),
        Commands::Suggestions => {
            let suggestions = service.transfer_suggestions()?;
            if suggestions.is_empty() {
                println!("No transfers suggested.");
            }
            for s in suggestions {
                println!(
                    "{} ({}) is in {} room {}; ideal category: {}",
                    s.patient.name,
                    s.patient.condition,
                    s.current_room.room_type,
                    s.current_room.room_number,
                    s.ideal_category
                );
            }
        }
        Commands::SetRoomStatus { room_id, status } => {
            let room = service.update_room_status(&room_id, status)?;
            println!("Room {} is now {}", room.room_number, room.status);
        }
        Commands::Summary => {
            let summary = service.summary()?;
            println!("Rooms: {}", summary.total_rooms);
            for (status, count) in &summary.rooms_by_status {
                println!("  {}: {}", status, count);
            }
            println!("Available by type:");
            for (room_type, count) in &summary.available_by_type {
                println!("  {}: {}", room_type, count);
            }
            println!(
                "Patients: {} active, {} waiting",
                summary.active_patients, summary.waiting_patients
            );
            println!("Occupancy: {:.0}%", summary.occupancy_rate * 100.0);
        }
    }
    Ok(())
}

fn print_patient(patient: &Patient) {
    println!(
        "ID: {}, Name: {}, Condition: {}, Priority: {}, Status: {}, Room: {}, Admitted: {}",
        patient.id,
        patient.name,
        patient.condition,
        patient.priority,
        patient.status,
        patient
            .assigned_room
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".into()),
        patient.admission_date.format("%Y-%m-%d %H:%M"),
    );
}

fn print_room(room: &Room) {
    println!(
        "ID: {}, Number: {}, Type: {}, Floor: {}, Status: {}, Patient: {}",
        room.id,
        room.room_number,
        room.room_type,
        room.floor,
        room.status,
        room.patient_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into()),
    );
}

fn print_outcome(outcome: &AllocationOutcome) {
    match outcome {
        AllocationOutcome::Allocated { patient, room } => {
            println!("Allocated room {} to {}", room.room_number, patient.name)
        }
        other => println!(
            "Nothing allocated: {}",
            other.reason().unwrap_or_default()
        ),
    }
}
