//! Slot exclusivo da conexão
//!
//! Guarda no máximo uma conexão. Quem faz `acquire` passa a ser o único dono
//! até devolvê-la com `release`; nenhum lock fica preso durante a leitura.

use parking_lot::Mutex;
use tokio::sync::Notify;

pub struct ConnectionSlot<C> {
    handle: Mutex<Option<C>>,
    available: Notify,
}

impl<C> ConnectionSlot<C> {
    /// Slot vazio.
    pub fn empty() -> Self {
        Self {
            handle: Mutex::new(None),
            available: Notify::new(),
        }
    }

    /// Slot já ocupado pela conexão inicial.
    pub fn with(conn: C) -> Self {
        Self {
            handle: Mutex::new(Some(conn)),
            available: Notify::new(),
        }
    }

    /// Espera até haver conexão no slot e a retira (o slot fica vazio).
    pub async fn acquire(&self) -> C {
        loop {
            if let Some(conn) = self.try_acquire() {
                return conn;
            }
            // `notify_one` guarda a permissão se ninguém estiver esperando,
            // então um release entre o try e o await não se perde.
            self.available.notified().await;
        }
    }

    /// Retira a conexão sem esperar.
    pub fn try_acquire(&self) -> Option<C> {
        self.handle.lock().take()
    }

    /// Devolve uma conexão ao slot e acorda um `acquire` pendente.
    ///
    /// # Retorno
    /// `Err(conn)` se o slot já estiver ocupado: a conexão excedente volta
    /// para quem chamou, o slot nunca guarda duas.
    pub fn release(&self, conn: C) -> Result<(), C> {
        {
            let mut handle = self.handle.lock();
            if handle.is_some() {
                return Err(conn);
            }
            *handle = Some(conn);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Esvazia o slot no desligamento.
    pub fn drain(&self) -> Option<C> {
        self.try_acquire()
    }

    pub fn is_occupied(&self) -> bool {
        self.handle.lock().is_some()
    }
}
